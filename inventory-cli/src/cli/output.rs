// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Formatting for CLI output

use chrono::{DateTime, Utc};
use colored::*;
use comfy_table::{presets::UTF8_FULL, Cell, Color, Table};
use inventory_store::storage::GraphStats;
use inventory_store::{Edge, Properties, Vertex};

use super::commands::OutputFormat;

/// One line of the segments listing
#[derive(Debug, Clone)]
pub struct SegmentRow {
    pub sequence: u64,
    pub committed_at: Option<DateTime<Utc>>,
    pub events: Option<usize>,
    pub bytes: u64,
    /// Why the segment could not be read
    pub problem: Option<String>,
}

pub struct GraphFormatter;

impl GraphFormatter {
    pub fn format_segments(rows: &[SegmentRow]) -> String {
        if rows.is_empty() {
            return format!("{}\n", "No pending segments".yellow());
        }

        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(
            ["Sequence", "Committed at", "Events", "Bytes", "Status"]
                .iter()
                .map(|h| Cell::new(h).fg(Color::Green))
                .collect::<Vec<_>>(),
        );
        for row in rows {
            let status = match &row.problem {
                Some(problem) => Cell::new(problem).fg(Color::Red),
                None => Cell::new("ok"),
            };
            table.add_row(vec![
                Cell::new(row.sequence),
                Cell::new(
                    row.committed_at
                        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                        .unwrap_or_else(|| "-".to_string()),
                ),
                Cell::new(
                    row.events
                        .map(|n| n.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                ),
                Cell::new(row.bytes),
                status,
            ]);
        }

        let mut output = format!("{}\n", "Pending segments".bold().green());
        output.push_str(&table.to_string());
        output.push('\n');
        output
    }

    pub fn format_graph(vertices: &[Vertex], edges: &[Edge], format: OutputFormat) -> String {
        match format {
            OutputFormat::Table => Self::graph_table(vertices, edges),
            OutputFormat::Json => Self::graph_json(vertices, edges),
        }
    }

    fn graph_table(vertices: &[Vertex], edges: &[Edge]) -> String {
        let mut output = String::new();

        output.push_str(&format!("{} ({})\n", "Vertices".bold().green(), vertices.len()));
        if !vertices.is_empty() {
            let mut table = Table::new();
            table.load_preset(UTF8_FULL);
            table.set_header(vec![
                Cell::new("Id").fg(Color::Green),
                Cell::new("Label").fg(Color::Green),
                Cell::new("Properties").fg(Color::Green),
            ]);
            for vertex in vertices {
                table.add_row(vec![
                    Cell::new(vertex.id),
                    Cell::new(&vertex.label),
                    Cell::new(Self::properties_to_string(&vertex.properties)),
                ]);
            }
            output.push_str(&table.to_string());
            output.push('\n');
        }

        output.push_str(&format!("{} ({})\n", "Edges".bold().green(), edges.len()));
        if !edges.is_empty() {
            let mut table = Table::new();
            table.load_preset(UTF8_FULL);
            table.set_header(vec![
                Cell::new("Id").fg(Color::Green),
                Cell::new("Label").fg(Color::Green),
                Cell::new("Out").fg(Color::Green),
                Cell::new("In").fg(Color::Green),
                Cell::new("Properties").fg(Color::Green),
            ]);
            for edge in edges {
                table.add_row(vec![
                    Cell::new(edge.id),
                    Cell::new(&edge.label),
                    Cell::new(edge.out_vertex),
                    Cell::new(edge.in_vertex),
                    Cell::new(Self::properties_to_string(&edge.properties)),
                ]);
            }
            output.push_str(&table.to_string());
            output.push('\n');
        }

        output
    }

    fn graph_json(vertices: &[Vertex], edges: &[Edge]) -> String {
        let json = serde_json::json!({
            "vertices": vertices.iter().map(|v| serde_json::json!({
                "id": v.id.id(),
                "label": v.label,
                "properties": Self::properties_to_json(&v.properties),
            })).collect::<Vec<_>>(),
            "edges": edges.iter().map(|e| serde_json::json!({
                "id": e.id.id(),
                "label": e.label,
                "out": e.out_vertex.id(),
                "in": e.in_vertex.id(),
                "properties": Self::properties_to_json(&e.properties),
            })).collect::<Vec<_>>(),
        });
        Self::pretty(&json)
    }

    pub fn format_stats(stats: &GraphStats, segments: usize, format: OutputFormat) -> String {
        match format {
            OutputFormat::Json => Self::pretty(&serde_json::json!({
                "vertices": stats.vertex_count,
                "edges": stats.edge_count,
                "vertex_labels": stats.vertex_label_count,
                "edge_labels": stats.edge_label_count,
                "pending_segments": segments,
            })),
            OutputFormat::Table => {
                let mut table = Table::new();
                table.load_preset(UTF8_FULL);
                table.set_header(vec![
                    Cell::new("Metric").fg(Color::Green),
                    Cell::new("Value").fg(Color::Green),
                ]);
                table.add_row(vec![Cell::new("Vertices"), Cell::new(stats.vertex_count)]);
                table.add_row(vec![Cell::new("Edges"), Cell::new(stats.edge_count)]);
                table.add_row(vec![
                    Cell::new("Vertex labels"),
                    Cell::new(stats.vertex_label_count),
                ]);
                table.add_row(vec![
                    Cell::new("Edge labels"),
                    Cell::new(stats.edge_label_count),
                ]);
                table.add_row(vec![Cell::new("Pending segments"), Cell::new(segments)]);
                format!("{}\n", table)
            }
        }
    }

    fn properties_to_string(properties: &Properties) -> String {
        properties
            .iter()
            .map(|(key, value)| format!("{}: {}", key, value))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn properties_to_json(properties: &Properties) -> serde_json::Value {
        serde_json::Value::Object(
            properties
                .iter()
                .map(|(key, value)| (key.clone(), value.to_json()))
                .collect(),
        )
    }

    fn pretty(json: &serde_json::Value) -> String {
        let mut text = serde_json::to_string_pretty(json).unwrap_or_else(|_| {
            "{\"status\": \"error\", \"error\": \"Could not serialize output\"}".to_string()
        });
        text.push('\n');
        text
    }
}
