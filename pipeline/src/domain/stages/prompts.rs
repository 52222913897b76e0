//! Prompt text for every stage.
//!
//! Producers must answer with JSON only; validators must answer with the
//! `{validation_passed, issues, message}` report object.

use crate::domain::schema::TableRef;
use crate::domain::workflow::StageSpec;

const PRODUCER_PERSONA: &str = "Expert Database Analyst";
const VALIDATOR_PERSONA: &str = "Expert Database Validator";
const DATA_ANALYST_PERSONA: &str = "Expert Data Analyst";
const RESULTS_VALIDATOR_PERSONA: &str = "Expert Results Validator";
const REPORT_EXPECTATION: &str =
    "Strict JSON object with validation_passed, issues[] and message keys.";

/// Values interpolated into every prompt.
pub(super) struct PromptContext<'a> {
    pub(super) database: &'a str,
    pub(super) tools: &'a str,
}

impl PromptContext<'_> {
    fn tool_rules(&self, catalog_views: &str) -> String {
        format!(
            "RULES:\n\
             1. Use the schema tools first: {tools}.\n\
             2. Only when they return incomplete information, run a T-SQL query against \
             {catalog_views} through the query tool.\n\
             3. Never assume or invent results.",
            tools = self.tools,
        )
    }

    fn report_format(&self, issue_kinds: &str, subject_key: &str) -> String {
        format!(
            "4. Answer ONLY with JSON in this format:\n\
             {{\n  \"validation_passed\": true|false,\n  \"issues\": [\n    {{\n      \
             \"type\": \"{issue_kinds}\",\n      \"{subject_key}\": \"...\",\n      \
             \"details\": \"explanation of the issue\"\n    }}\n  ],\n  \
             \"message\": \"<summary>\"\n}}"
        )
    }
}

pub(super) fn table_inventory(ctx: &PromptContext<'_>) -> (StageSpec, StageSpec) {
    const VIEWS: &str = "sys.tables and sys.schemas";
    let producer = StageSpec::producer(
        PRODUCER_PERSONA,
        format!(
            "Query the {db} database and return every schema and table name.\n\n{rules}\n\
             4. Answer ONLY with JSON in this format:\n\
             [\n  {{ \"schema\": \"schema_name\", \"table\": \"table_name\" }}\n]",
            db = ctx.database,
            rules = ctx.tool_rules(VIEWS),
        ),
        "Strict JSON array of objects with 'schema' and 'table' keys only.",
    );
    let validator = StageSpec::validator(
        VALIDATOR_PERSONA,
        format!(
            "Validate the schema and table list extracted from the {db} database.\n\n\
             {rules}\n{format}",
            db = ctx.database,
            rules = ctx.tool_rules(VIEWS),
            format = ctx.report_format(
                "missing_table|duplicate_table|missing_schema|other",
                "table"
            ),
        ),
        REPORT_EXPECTATION,
    );
    (producer, validator)
}

pub(super) fn columns(ctx: &PromptContext<'_>, table: &TableRef) -> (StageSpec, StageSpec) {
    const VIEWS: &str = "sys.tables, sys.columns, sys.types, sys.indexes and sys.index_columns";
    let producer = StageSpec::producer(
        PRODUCER_PERSONA,
        format!(
            "Query the {table} table of the {db} database and return column_name, data_type, \
             length, is_primary_key and is_nullable for every column.\n\n{rules}\n\
             4. Answer ONLY with JSON in this format:\n\
             [\n  {{\n    \"table_name\": \"{name}\",\n    \"column_name\": \"column_name\",\n    \
             \"data_type\": \"data_type\",\n    \"length\": \"length\",\n    \
             \"is_primary_key\": \"is_primary_key\",\n    \"is_nullable\": \"is_nullable\"\n  }}\n]",
            db = ctx.database,
            name = table.table,
            rules = ctx.tool_rules(VIEWS),
        ),
        "Strict JSON array of objects with 'table_name', 'column_name', 'data_type', 'length', \
         'is_primary_key' and 'is_nullable' keys only.",
    );
    let validator = StageSpec::validator(
        VALIDATOR_PERSONA,
        format!(
            "Validate the extracted information of each column of the {table} table in the \
             {db} database.\n\n{rules}\n{format}",
            db = ctx.database,
            rules = ctx.tool_rules(VIEWS),
            format = ctx.report_format(
                "missing_column|incorrect_type|incorrect_length|incorrect_primary_key|incorrect_nullable|other",
                "name"
            ),
        ),
        REPORT_EXPECTATION,
    );
    (producer, validator)
}

pub(super) fn relationships(ctx: &PromptContext<'_>, table: &TableRef) -> (StageSpec, StageSpec) {
    const VIEWS: &str = "sys.foreign_keys and sys.foreign_key_columns";
    let producer = StageSpec::producer(
        PRODUCER_PERSONA,
        format!(
            "Query the {table} table of the {db} database and return all of its foreign keys.\
             \n\n{rules}\n\
             4. Answer ONLY with JSON in this format:\n\
             [\n  {{\n    \"name\": \"constraint_name\",\n    \"table\": \"{name}\",\n    \
             \"column\": \"column_name\",\n    \"ref_table\": \"parent_table_name\",\n    \
             \"ref_column\": \"parent_column_name\"\n  }}\n]\n\
             Answer with [] when the table has no foreign keys.",
            db = ctx.database,
            name = table.table,
            rules = ctx.tool_rules(VIEWS),
        ),
        "Strict JSON array of objects with 'name', 'table', 'column', 'ref_table' and \
         'ref_column' keys.",
    );
    let validator = StageSpec::validator(
        VALIDATOR_PERSONA,
        format!(
            "Validate each extracted foreign key of the {table} table in the {db} database.\
             \n\n{rules}\n{format}",
            db = ctx.database,
            rules = ctx.tool_rules(VIEWS),
            format = ctx.report_format(
                "missing_fk|incorrect_fk|non_existing_fk|duplicate_fk|other",
                "name"
            ),
        ),
        REPORT_EXPECTATION,
    );
    (producer, validator)
}

pub(super) fn analysis_task(ctx: &PromptContext<'_>, description: &str) -> (StageSpec, StageSpec) {
    let producer = StageSpec::producer(
        DATA_ANALYST_PERSONA,
        format!(
            "Execute the following data analysis task on the {db} database: \"{description}\"\n\n\
             RULES:\n\
             1. Run your SQL through the data reading tool ({tools}); use the rows it actually \
             returns.\n\
             2. Never invent results. When the query returns nothing use [] for 'results' and 0 \
             for 'row_count'.\n\
             3. Answer ONLY with JSON in this format:\n\
             {{\n  \"task\": \"{description}\",\n  \"query\": \"SQL query used\",\n  \
             \"results\": [ {{ \"column\": \"value\" }} ],\n  \"row_count\": 0\n}}",
            db = ctx.database,
            tools = ctx.tools,
        ),
        "Strict JSON object with 'task', 'query', 'results' and 'row_count' keys holding real \
         query results.",
    );
    let validator = StageSpec::validator(
        RESULTS_VALIDATOR_PERSONA,
        format!(
            "Validate the data analysis results for the task \"{description}\" on the {db} \
             database.\n\n\
             RULES:\n\
             1. Re-run the same or an equivalent query through the data reading tool ({tools}).\n\
             2. Set validation_passed to false when the results do not match the database or \
             look fabricated.\n\
             3. Never assume or invent issues.\n{format}",
            db = ctx.database,
            tools = ctx.tools,
            format = ctx.report_format(
                "incorrect_data|missing_data|invalid_query|hallucinated_results|other",
                "description"
            ),
        ),
        REPORT_EXPECTATION,
    );
    (producer, validator)
}
