//! Prompt text for SQL generation and narrative summaries.

use aicp_core::Role;

/// System prompt for SQL generation: read-only rules plus the role's scope hint.
pub fn sql_system_prompt(schema: &str, policy_hint: &str) -> String {
    format!(
        "You are an expert SQL assistant for a PostgreSQL database.\n\
         You have READ-ONLY access.\n\n\
         CRITICAL SAFETY RULES:\n\
         - Output exactly ONE SQL SELECT query.\n\
         - Allowed clauses: SELECT, FROM, JOIN, WHERE, GROUP BY, ORDER BY, LIMIT.\n\
         - Never use INSERT/UPDATE/DELETE/DROP/ALTER/TRUNCATE/CREATE/MERGE.\n\
         - Always use explicit {schema}.<table> names.\n\
         - ONLY use columns that exist in the provided schema. NEVER invent or assume column names.\n\
         - If a column does not exist in the schema, you CANNOT use it in your query.\n\n\
         PATIENT COUNT RULE:\n\
         - When counting or identifying patients, ALWAYS use {schema}.patients as the primary table.\n\
         - Do NOT infer total patients from patient_notes, walkin_cases, or other auxiliary tables.\n\n\
         DATA EXTRACTION RULES:\n\
         - For diagnosis information: search within the 'note' column of {schema}.patient_notes using LIKE or string functions.\n\
         - For unstructured data: use WHERE note LIKE '%keyword%' or string analysis functions.\n\
         - Do NOT assume structured columns exist if they are not in the schema.\n\n\
         ROLE-BASED ACCESS POLICY:\n{policy_hint}\n\n\
         If the user asks something outside their permission, do NOT try to bypass it.\n\
         Instead, write a query that returns an allowed aggregate or allowed subset.\n\
         Return ONLY the SQL query, with no explanation and no markdown."
    )
}

/// User prompt for SQL generation. Pharmacy users get aggregation guidance.
pub fn sql_user_prompt(schema_text: &str, question: &str, role: Role) -> String {
    let role_hint = match role {
        Role::Pharmacy => {
            "\nExtra guidance for pharmacy role:\n\
             - Prefer aggregated outputs (counts, totals, distributions) over listing patient rows.\n\
             - Avoid selecting any patient identity or contact information.\n"
        }
        Role::Doctor | Role::Admin => "",
    };
    format!("Schema:\n{schema_text}\n\nUser question: {question}\n{role_hint}\nWrite the SQL query now.")
}

pub const NARRATIVE_SYSTEM_PROMPT: &str = "You are a senior data analyst for a clinical research portal.\n\
You will see:\n\
1) The user's question\n\
2) The SQL query that was run\n\
3) A small preview of the result table\n\
4) A numeric summary (count, mean, std, quartiles)\n\
5) Simple categorical summaries (value counts)\n\
6) An automatic advanced analysis (tiers, outliers, correlations)\n\n\
Using all of that, provide a concise but insightful analysis:\n\
- Directly answer the question.\n\
- Mention key numbers (totals, averages, ranges, outliers).\n\
- Highlight any obvious patterns or imbalances.\n\
- Optionally comment on correlations or tiers if they matter.\n\
- If there are no rows, clearly say so.\n\
Write 3-7 sentences, no SQL and no markdown.";

pub struct NarrativeContext<'a> {
    pub question: &'a str,
    pub sql: &'a str,
    pub preview: &'a str,
    pub numeric: &'a str,
    pub categorical: &'a str,
    pub advanced: &'a str,
}

pub fn narrative_user_prompt(ctx: &NarrativeContext<'_>) -> String {
    format!(
        "User question:\n{}\n\n\
         SQL query executed:\n{}\n\n\
         Result preview (first rows):\n{}\n\n\
         Numeric summary:\n{}\n\n\
         Categorical summary (value counts):\n{}\n\n\
         Advanced analysis (tiers, outliers, correlations):\n{}\n",
        ctx.question, ctx.sql, ctx.preview, ctx.numeric, ctx.categorical, ctx.advanced
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompt_carries_hint_and_schema() {
        let prompt = sql_system_prompt("dbo", "Only include patients where dbo.patients.pharmacy_id = 2.");
        assert!(prompt.contains("ROLE-BASED ACCESS POLICY:\nOnly include patients where dbo.patients.pharmacy_id = 2."));
        assert!(prompt.contains("explicit dbo.<table> names"));
    }

    #[test]
    fn only_pharmacy_gets_aggregation_guidance() {
        let pharmacy = sql_user_prompt("Table dbo.patients(id int)", "How many?", Role::Pharmacy);
        assert!(pharmacy.contains("Extra guidance for pharmacy role"));
        let doctor = sql_user_prompt("Table dbo.patients(id int)", "How many?", Role::Doctor);
        assert!(!doctor.contains("Extra guidance"));
        assert!(doctor.ends_with("Write the SQL query now."));
    }
}
