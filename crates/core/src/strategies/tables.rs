//! Table structure fixes: header rows, scope attributes, captions, and
//! explicit header/cell association.
//!
//! The table is cloned into a scratch fragment, restructured there with node
//! operations, and handed back as one `ReplaceHtml` fix. Loose `<td>`/`<th>`
//! markup cannot survive fragment parsing, so cells are never built from
//! markup strings.

use ego_tree::NodeId;
use scraper::Html;

use crate::apply::Fix;
use crate::dom;
use crate::generate::GenerationRequest;
use crate::issue::{IssueRecord, IssueType};
use crate::strategies::{StrategyContext, StrategyError};

pub fn build_fix(
    doc: &Html,
    target: NodeId,
    issue: &IssueRecord,
    ctx: &StrategyContext<'_>,
) -> Result<Option<Fix>, StrategyError> {
    let Some(table_id) = find_table(doc, target) else {
        return Ok(None);
    };
    let Some((mut scratch, table)) = dom::clone_element(doc, table_id) else {
        return Ok(None);
    };

    let changed = match &issue.kind {
        IssueType::TableMissingHeaders | IssueType::TableMissingThead => {
            ensure_thead(&mut scratch, table)
        }
        IssueType::TableMissingTbody => ensure_tbody(&mut scratch, table),
        IssueType::TableMissingScope => fix_scopes(&mut scratch, table),
        IssueType::TableMissingCaption => ensure_caption(&mut scratch, table, ctx)?,
        IssueType::TableIrregularHeaders | IssueType::TableMissingHeadersId => {
            associate_headers(&mut scratch, table)
        }
        other => return Err(StrategyError::Unsupported(other.to_string())),
    };
    if !changed {
        return Ok(None);
    }
    let html = dom::element_ref(&scratch, table)
        .map(|e| e.html())
        .unwrap_or_default();
    if html.is_empty() {
        return Ok(None);
    }
    Ok(Some(Fix::ReplaceHtml { html }))
}

/// The issue may point at the table itself, a cell inside it, or a wrapper
/// around it.
fn find_table(doc: &Html, target: NodeId) -> Option<NodeId> {
    if dom::tag_name(doc, target).as_deref() == Some("table") {
        return Some(target);
    }
    let node = doc.tree.get(target)?;
    for ancestor in node.ancestors() {
        if ancestor.value().as_element().is_some_and(|e| e.name() == "table") {
            return Some(ancestor.id());
        }
    }
    dom::select_within(doc, target, "table").into_iter().next()
}

fn rows(doc: &Html, table: NodeId) -> Vec<NodeId> {
    dom::select_within(doc, table, "tr")
}

fn cells(doc: &Html, row: NodeId) -> Vec<NodeId> {
    let Some(node) = doc.tree.get(row) else {
        return Vec::new();
    };
    node.children()
        .filter(|c| {
            c.value()
                .as_element()
                .is_some_and(|e| e.name() == "td" || e.name() == "th")
        })
        .map(|c| c.id())
        .collect()
}

fn in_thead(doc: &Html, id: NodeId) -> bool {
    doc.tree.get(id).is_some_and(|node| {
        node.ancestors()
            .any(|a| a.value().as_element().is_some_and(|e| e.name() == "thead"))
    })
}

/// Convert the first row into a proper header row inside `<thead>`. The
/// parser has already normalized body rows into `<tbody>`, so only the first
/// row moves.
fn ensure_thead(doc: &mut Html, table: NodeId) -> bool {
    if !dom::select_within(doc, table, "thead").is_empty() {
        return false;
    }
    let all_rows = rows(doc, table);
    let Some(&first_row) = all_rows.first() else {
        return false;
    };
    for cell in cells(doc, first_row) {
        if dom::tag_name(doc, cell).as_deref() == Some("td") {
            dom::rename_element(&mut doc.tree, cell, "th");
        }
        dom::set_attr(&mut doc.tree, cell, "scope", "col");
    }

    let thead = dom::create_element(&mut doc.tree, "thead", &[]);
    if let Some(mut row) = doc.tree.get_mut(first_row) {
        row.detach();
    }
    if let Some(mut node) = doc.tree.get_mut(thead) {
        node.append_id(first_row);
    }
    // After a caption if one exists, otherwise first.
    let caption = dom::select_within(doc, table, "caption").into_iter().next();
    match caption {
        Some(caption) => {
            if let Some(mut node) = doc.tree.get_mut(caption) {
                node.insert_id_after(thead);
            }
        }
        None => {
            if let Some(mut node) = doc.tree.get_mut(table) {
                node.prepend_id(thead);
            }
        }
    }
    true
}

/// Move rows that sit directly under the table into a `<tbody>`. Usually a
/// no-op because the parser inserts one, but audit input may arrive from
/// other producers.
fn ensure_tbody(doc: &mut Html, table: NodeId) -> bool {
    let stray: Vec<NodeId> = match doc.tree.get(table) {
        Some(node) => node
            .children()
            .filter(|c| c.value().as_element().is_some_and(|e| e.name() == "tr"))
            .map(|c| c.id())
            .collect(),
        None => return false,
    };
    if stray.is_empty() {
        return false;
    }
    let tbody = dom::create_element(&mut doc.tree, "tbody", &[]);
    if let Some(mut node) = doc.tree.get_mut(table) {
        node.append_id(tbody);
    }
    for row in stray {
        if let Some(mut node) = doc.tree.get_mut(row) {
            node.detach();
        }
        if let Some(mut node) = doc.tree.get_mut(tbody) {
            node.append_id(row);
        }
    }
    true
}

/// Position-derived scope for header cells that lack one: header-row cells
/// label columns, first-column cells label rows.
fn fix_scopes(doc: &mut Html, table: NodeId) -> bool {
    let all_rows = rows(doc, table);
    let mut updates: Vec<(NodeId, &str)> = Vec::new();
    for (row_idx, &row) in all_rows.iter().enumerate() {
        for (cell_idx, cell) in cells(doc, row).into_iter().enumerate() {
            if dom::tag_name(doc, cell).as_deref() != Some("th") {
                continue;
            }
            if dom::get_attr(doc, cell, "scope").is_some() {
                continue;
            }
            let scope = if in_thead(doc, cell) || row_idx == 0 {
                "col"
            } else if cell_idx == 0 {
                "row"
            } else {
                "col"
            };
            updates.push((cell, scope));
        }
    }
    let changed = !updates.is_empty();
    for (cell, scope) in updates {
        dom::set_attr(&mut doc.tree, cell, "scope", scope);
    }
    changed
}

fn header_texts(doc: &Html, table: NodeId) -> Vec<String> {
    rows(doc, table)
        .first()
        .map(|&row| {
            cells(doc, row)
                .into_iter()
                .map(|c| dom::inner_text(doc, c).trim().to_string())
                .filter(|t| !t.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

fn ensure_caption(
    doc: &mut Html,
    table: NodeId,
    ctx: &StrategyContext<'_>,
) -> Result<bool, StrategyError> {
    let existing = dom::select_within(doc, table, "caption").into_iter().next();
    if existing.is_some_and(|c| !dom::inner_text(doc, c).trim().is_empty()) {
        return Ok(false);
    }

    let headers = header_texts(doc, table);
    let text = match ctx.generator {
        Some(generator) => {
            let prompt = format!(
                "Write a one-sentence caption for a data table with these column \
                 headers: {}",
                headers.join(", ")
            );
            match generator.generate(&GenerationRequest::text(prompt)) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(error = %e, "caption generation failed, using headers");
                    heuristic_caption(&headers)
                }
            }
        }
        None => heuristic_caption(&headers),
    };

    let caption = dom::create_element(&mut doc.tree, "caption", &[]);
    let caption_text = dom::create_text(&mut doc.tree, &text);
    if let Some(mut node) = doc.tree.get_mut(caption) {
        node.append_id(caption_text);
    }
    match existing {
        Some(empty) => {
            if let Some(mut node) = doc.tree.get_mut(empty) {
                node.insert_id_before(caption);
            }
            if let Some(mut node) = doc.tree.get_mut(empty) {
                node.detach();
            }
        }
        None => {
            if let Some(mut node) = doc.tree.get_mut(table) {
                node.prepend_id(caption);
            }
        }
    }
    Ok(true)
}

fn heuristic_caption(headers: &[String]) -> String {
    if headers.is_empty() {
        "Data table".to_string()
    } else {
        format!("Table with columns: {}", headers.join(", "))
    }
}

/// Give header cells ids and point every data cell's `headers` attribute at
/// its column and row headers.
fn associate_headers(doc: &mut Html, table: NodeId) -> bool {
    let all_rows = rows(doc, table);
    if all_rows.is_empty() {
        return false;
    }

    // Column headers come from the first row; row headers are leading `th`
    // cells in later rows.
    let mut attr_updates: Vec<(NodeId, &'static str, String)> = Vec::new();
    let mut col_ids: Vec<Option<String>> = Vec::new();
    for (cell_idx, cell) in cells(doc, all_rows[0]).into_iter().enumerate() {
        if dom::tag_name(doc, cell).as_deref() == Some("th") {
            let id = dom::get_attr(doc, cell, "id").unwrap_or_else(|| format!("col-{cell_idx}"));
            attr_updates.push((cell, "id", id.clone()));
            col_ids.push(Some(id));
        } else {
            col_ids.push(None);
        }
    }

    for (row_idx, &row) in all_rows.iter().enumerate().skip(1) {
        let row_cells = cells(doc, row);
        let row_header_id = row_cells.first().and_then(|&first| {
            if dom::tag_name(doc, first).as_deref() == Some("th") {
                let id = dom::get_attr(doc, first, "id").unwrap_or_else(|| format!("row-{row_idx}"));
                attr_updates.push((first, "id", id.clone()));
                Some(id)
            } else {
                None
            }
        });
        for (cell_idx, cell) in row_cells.into_iter().enumerate() {
            if dom::tag_name(doc, cell).as_deref() != Some("td") {
                continue;
            }
            let mut refs: Vec<String> = Vec::new();
            if let Some(Some(col)) = col_ids.get(cell_idx) {
                refs.push(col.clone());
            }
            if let Some(row_header) = &row_header_id {
                if cell_idx != 0 {
                    refs.push(row_header.clone());
                }
            }
            if !refs.is_empty() {
                attr_updates.push((cell, "headers", refs.join(" ")));
            }
        }
    }

    let mut changed = false;
    for (cell, name, value) in attr_updates {
        if dom::get_attr(doc, cell, name).as_deref() != Some(value.as_str()) {
            dom::set_attr(&mut doc.tree, cell, name, &value);
            changed = true;
        }
    }
    changed
}
