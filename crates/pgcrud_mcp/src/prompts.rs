//! Prompts synthesized from the schema model.
//!
//! Two prompts guide an agent through the surface: a database overview and
//! a per-table CRUD walkthrough. Both are rendered from the accessible
//! model, so a scoped session never sees tables it cannot touch.

use std::fmt::Write as _;

use serde_json::Value;

use pgcrud_auth::TokenClaims;
use pgcrud_core::{Gateway, GatewayError};

use crate::proto::{
    PromptArgument, PromptContent, PromptDefinition, PromptMessage, PromptsGetResult,
};

pub const DATABASE_OVERVIEW: &str = "database-overview";
pub const CRUD_GUIDE: &str = "crud-guide";

/// All available prompts.
pub fn list_prompts() -> Vec<PromptDefinition> {
    vec![
        PromptDefinition {
            name: DATABASE_OVERVIEW.to_string(),
            description: "Overview of every accessible table and how to query them".to_string(),
            arguments: None,
        },
        PromptDefinition {
            name: CRUD_GUIDE.to_string(),
            description: "Step-by-step CRUD guide for one table".to_string(),
            arguments: Some(vec![PromptArgument {
                name: "table".to_string(),
                description: "Route segment of the table".to_string(),
                required: true,
            }]),
        },
    ]
}

/// Render a prompt by name.
pub fn get_prompt(
    gateway: &Gateway,
    claims: &TokenClaims,
    name: &str,
    arguments: Option<&Value>,
) -> Result<PromptsGetResult, GatewayError> {
    match name {
        DATABASE_OVERVIEW => Ok(database_overview(gateway, claims)),
        CRUD_GUIDE => {
            let table = arguments
                .and_then(|args| args.get("table"))
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    GatewayError::validation("prompt 'crud-guide' requires a 'table' argument")
                })?;
            crud_guide(gateway, claims, table)
        }
        _ => Err(GatewayError::not_found(format!("Unknown prompt '{name}'"))),
    }
}

fn message(description: String, text: String) -> PromptsGetResult {
    PromptsGetResult {
        description: Some(description),
        messages: vec![PromptMessage {
            role: "user".to_string(),
            content: PromptContent::Text { text },
        }],
    }
}

fn database_overview(gateway: &Gateway, claims: &TokenClaims) -> PromptsGetResult {
    let tables = gateway.list_tables(claims);
    let mut text = String::from(
        "# Database overview\n\n\
         This gateway exposes a relational database as uniform CRUD tools.\n\
         Use `list_records` / `get_record` to read and `create_record` / \
         `update_record` / `delete_record` to write; `describe_table` shows \
         column types before you write.\n\n## Accessible tables\n\n",
    );

    if tables.is_empty() {
        text.push_str("(none: the current credential has no namespace access)\n");
    }
    for table in &tables {
        let _ = writeln!(
            text,
            "- `{}` ({}.{}): primary key: {}; operations: {}",
            table.path.trim_start_matches("/api/"),
            table.namespace,
            table.name,
            if table.primary_key.is_empty() {
                "none".to_string()
            } else {
                table.primary_key.join(", ")
            },
            table.operations.join(", "),
        );
    }

    text.push_str(
        "\n## Conventions\n\n\
         - Filters: `{\"column\": \"operator:value\"}` with eq, neq, gt, gte, lt, lte, \
           like, ilike, is, in.\n\
         - Soft-deleted rows stay visible; filter them out with \
           `{\"deleted_at\": \"is:null\"}` on tables that have that column.\n\
         - Composite keys are comma-joined in primary-key order.\n",
    );

    message("Overview of the accessible database".to_string(), text)
}

fn crud_guide(
    gateway: &Gateway,
    claims: &TokenClaims,
    segment: &str,
) -> Result<PromptsGetResult, GatewayError> {
    let table = gateway.describe_table(claims, segment)?;

    let mut text = format!(
        "# CRUD guide for `{segment}`\n\nTable `{}.{}`.\n\n## Columns\n\n",
        table.namespace, table.name
    );
    for column in &table.columns {
        let _ = writeln!(
            text,
            "- `{}`: {}{}{}{}",
            column.name,
            column.type_name,
            column
                .format
                .map(|f| format!(" ({f:?})").to_lowercase())
                .unwrap_or_default(),
            if column.primary_key { ", primary key" } else { "" },
            if column.insert_required {
                ", required on insert"
            } else {
                ""
            },
        );
    }

    let _ = writeln!(
        text,
        "\n## Reading\n\n\
         - `list_records` with `table: \"{segment}\"`, optional `filters`, `search`, \
           `sortBy`, `page`/`pageSize`.\n\
         - `get_record` with `id` set to the primary key{}.",
        if table.primary_key.len() > 1 {
            format!(
                " (comma-joined values of {})",
                table.primary_key.join(", ")
            )
        } else {
            String::new()
        }
    );

    let _ = writeln!(
        text,
        "\n## Writing\n\n\
         - `create_record` with `data` as an object (or array for bulk).\n\
         - `update_record` changes only the columns present in `data`.\n\
         - `delete_record` removes by key{}.",
        if table
            .columns
            .iter()
            .any(|c| c.name == pgcrud_schema::SOFT_DELETE_COLUMN)
        {
            " (soft delete: the row is kept with `deleted_at` set)"
        } else {
            ""
        }
    );

    if !table.searchable_columns.is_empty() {
        let _ = writeln!(
            text,
            "\nSearch covers: {}.",
            table.searchable_columns.join(", ")
        );
    }

    Ok(message(format!("CRUD guide for {segment}"), text))
}
