//! Conversion between [`RemoteBlock`] and Notion wire JSON.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::block::{rich_text_plain, RemoteBlock, RemoteBlockKind, RichText};
use super::{PageMetadata, RemoteError};

/// Serializes a block for an append request.
///
/// Children are included down to `levels` levels below this block. Table
/// rows are always included since a table cannot be created empty.
pub fn block_to_json(block: &RemoteBlock, levels: usize) -> Value {
    let (type_name, mut payload) = payload_for(&block.kind);

    let inline_children = levels > 0 || matches!(block.kind, RemoteBlockKind::Table { .. });
    if inline_children && !block.children.is_empty() {
        let children: Vec<Value> = block
            .children
            .iter()
            .map(|child| block_to_json(child, levels.saturating_sub(1)))
            .collect();
        payload.insert("children".to_string(), Value::Array(children));
    }

    let mut object = Map::new();
    object.insert("object".to_string(), json!("block"));
    object.insert("type".to_string(), json!(type_name));
    object.insert(type_name.to_string(), Value::Object(payload));
    Value::Object(object)
}

/// True when `block_to_json` at `levels` leaves some descendants unsent.
pub fn has_deferred_children(block: &RemoteBlock, levels: usize) -> bool {
    if matches!(block.kind, RemoteBlockKind::Table { .. }) {
        return false;
    }
    if levels == 0 {
        return !block.children.is_empty();
    }
    block
        .children
        .iter()
        .any(|child| has_deferred_children(child, levels - 1))
}

fn payload_for(kind: &RemoteBlockKind) -> (&str, Map<String, Value>) {
    let value = match kind {
        RemoteBlockKind::Paragraph { rich_text }
        | RemoteBlockKind::BulletedListItem { rich_text }
        | RemoteBlockKind::NumberedListItem { rich_text }
        | RemoteBlockKind::Quote { rich_text } => json!({ "rich_text": rich_text }),
        RemoteBlockKind::Heading {
            rich_text,
            is_toggleable,
            ..
        } => json!({ "rich_text": rich_text, "is_toggleable": is_toggleable }),
        RemoteBlockKind::ToDo { rich_text, checked } => {
            json!({ "rich_text": rich_text, "checked": checked })
        }
        RemoteBlockKind::Code {
            rich_text,
            language,
        } => json!({ "rich_text": rich_text, "language": language }),
        RemoteBlockKind::Callout { rich_text, emoji } => match emoji {
            Some(emoji) => json!({
                "rich_text": rich_text,
                "icon": { "type": "emoji", "emoji": emoji }
            }),
            None => json!({ "rich_text": rich_text }),
        },
        RemoteBlockKind::Equation { expression } => json!({ "expression": expression }),
        RemoteBlockKind::Divider => json!({}),
        RemoteBlockKind::Image { url, caption } => json!({
            "type": "external",
            "external": { "url": url },
            "caption": caption
        }),
        RemoteBlockKind::Table {
            table_width,
            has_column_header,
        } => json!({
            "table_width": table_width,
            "has_column_header": has_column_header,
            "has_row_header": false
        }),
        RemoteBlockKind::TableRow { cells } => json!({ "cells": cells }),
        RemoteBlockKind::ChildPage { title } | RemoteBlockKind::ChildDatabase { title } => {
            json!({ "title": title })
        }
        RemoteBlockKind::Unsupported { text, .. } => {
            return (
                "paragraph",
                object(json!({ "rich_text": [RichText::text(text.clone())] })),
            );
        }
    };
    (kind.type_name(), object(value))
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn rich_text_at(value: &Value) -> Vec<RichText> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| RichText::deserialize(item).ok())
                .collect()
        })
        .unwrap_or_default()
}

fn str_at(value: &Value) -> String {
    value.as_str().unwrap_or_default().to_string()
}

/// Parses a block object from a children listing.
pub fn block_from_json(value: &Value) -> RemoteBlock {
    let type_name = value["type"].as_str().unwrap_or("unknown");
    let payload = &value[type_name];
    let rich_text = || rich_text_at(&payload["rich_text"]);

    let kind = match type_name {
        "paragraph" => RemoteBlockKind::Paragraph {
            rich_text: rich_text(),
        },
        "heading_1" | "heading_2" | "heading_3" => RemoteBlockKind::Heading {
            level: match type_name {
                "heading_1" => 1,
                "heading_2" => 2,
                _ => 3,
            },
            rich_text: rich_text(),
            is_toggleable: payload["is_toggleable"].as_bool().unwrap_or(false),
        },
        "bulleted_list_item" => RemoteBlockKind::BulletedListItem {
            rich_text: rich_text(),
        },
        "numbered_list_item" => RemoteBlockKind::NumberedListItem {
            rich_text: rich_text(),
        },
        "to_do" => RemoteBlockKind::ToDo {
            rich_text: rich_text(),
            checked: payload["checked"].as_bool().unwrap_or(false),
        },
        "code" => RemoteBlockKind::Code {
            rich_text: rich_text(),
            language: str_at(&payload["language"]),
        },
        "quote" => RemoteBlockKind::Quote {
            rich_text: rich_text(),
        },
        "callout" => RemoteBlockKind::Callout {
            rich_text: rich_text(),
            emoji: payload["icon"]["emoji"].as_str().map(str::to_string),
        },
        "equation" => RemoteBlockKind::Equation {
            expression: str_at(&payload["expression"]),
        },
        "divider" => RemoteBlockKind::Divider,
        "image" => {
            let source = payload["type"].as_str().unwrap_or("external");
            RemoteBlockKind::Image {
                url: str_at(&payload[source]["url"]),
                caption: rich_text_at(&payload["caption"]),
            }
        }
        "table" => RemoteBlockKind::Table {
            table_width: payload["table_width"].as_u64().unwrap_or(0) as usize,
            has_column_header: payload["has_column_header"].as_bool().unwrap_or(false),
        },
        "table_row" => RemoteBlockKind::TableRow {
            cells: payload["cells"]
                .as_array()
                .map(|cells| cells.iter().map(rich_text_at).collect())
                .unwrap_or_default(),
        },
        "child_page" => RemoteBlockKind::ChildPage {
            title: str_at(&payload["title"]),
        },
        "child_database" => RemoteBlockKind::ChildDatabase {
            title: str_at(&payload["title"]),
        },
        other => RemoteBlockKind::Unsupported {
            type_name: other.to_string(),
            text: unsupported_text(payload),
        },
    };

    RemoteBlock {
        id: value["id"].as_str().map(str::to_string),
        kind,
        children: Vec::new(),
        has_children: value["has_children"].as_bool().unwrap_or(false),
    }
}

/// Best-effort text of a block type outside the modeled set.
fn unsupported_text(payload: &Value) -> String {
    let mut parts = Vec::new();
    let text = rich_text_plain(&rich_text_at(&payload["rich_text"]));
    if !text.is_empty() {
        parts.push(text);
    }
    let caption = rich_text_plain(&rich_text_at(&payload["caption"]));
    if !caption.is_empty() {
        parts.push(caption);
    }
    if let Some(url) = payload["url"].as_str() {
        parts.push(url.to_string());
    }
    parts.join(" ")
}

/// Builds the create-page request body.
pub fn create_page_body(parent: &super::PageParent, title: &str) -> Value {
    let title_text = json!([RichText::text(title)]);
    match parent {
        super::PageParent::Page(id) => json!({
            "parent": { "page_id": id },
            "properties": { "title": { "title": title_text } }
        }),
        super::PageParent::Database(id) => json!({
            "parent": { "database_id": id },
            "properties": { "Name": { "title": title_text } }
        }),
    }
}

/// Parses a page object into metadata. The title is read from whichever
/// property has type `title`.
pub fn page_metadata_from_json(value: &Value) -> Result<PageMetadata, RemoteError> {
    let id = value["id"]
        .as_str()
        .ok_or_else(|| RemoteError::Validation("page object without id".to_string()))?;
    let edited = value["last_edited_time"].as_str().unwrap_or_default();
    let last_edited_at = DateTime::parse_from_rfc3339(edited)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| RemoteError::Validation(format!("bad last_edited_time '{}': {}", edited, e)))?;

    let title = value["properties"]
        .as_object()
        .and_then(|props| props.values().find(|p| p["type"] == "title"))
        .map(|p| rich_text_plain(&rich_text_at(&p["title"])))
        .unwrap_or_default();

    let archived = value["archived"].as_bool().unwrap_or(false)
        || value["in_trash"].as_bool().unwrap_or(false);

    Ok(PageMetadata {
        id: id.to_string(),
        title,
        last_edited_at,
        archived,
    })
}

/// Reads `next_cursor` from a paginated response.
pub fn next_cursor(value: &Value) -> Option<String> {
    if !value["has_more"].as_bool().unwrap_or(false) {
        return None;
    }
    value["next_cursor"].as_str().map(str::to_string)
}
