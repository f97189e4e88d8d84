// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! # Baginfo CLI
//!
//! Summarize a ROS1 bag file: time range, message counts, and the
//! topic/type table.
//!
//! ## Usage
//!
//! ```sh
//! # Human-readable summary
//! baginfo drive.bag
//!
//! # Topic names only
//! baginfo --topics drive.bag
//!
//! # Machine-readable output
//! baginfo --json drive.bag
//! ```

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use bagcodec::{Bag, Time};

/// Baginfo - ROS1 bag summary tool
#[derive(Parser)]
#[command(name = "baginfo")]
#[command(about = "Summarize a ROS1 bag file", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Bag file to inspect
    file: PathBuf,

    /// Print topic names only
    #[arg(long)]
    topics: bool,

    /// Emit the summary as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let bag = Bag::open_file(&cli.file)
        .with_context(|| format!("failed to open {}", cli.file.display()))?;

    if cli.topics {
        for topic in bag.topics() {
            println!("{topic}");
        }
        return Ok(());
    }

    // Per-connection counts from the index.
    let mut counts: HashMap<u32, u64> = HashMap::new();
    for info in bag.chunk_infos() {
        for c in &info.counts {
            *counts.entry(c.conn).or_default() += c.count as u64;
        }
    }

    if cli.json {
        let connections: Vec<serde_json::Value> = bag
            .connections()
            .values()
            .map(|conn| {
                serde_json::json!({
                    "conn": conn.conn,
                    "topic": conn.topic,
                    "type": conn.message_type,
                    "md5sum": conn.md5sum,
                    "messages": counts.get(&conn.conn).copied().unwrap_or(0),
                })
            })
            .collect();
        let summary = serde_json::json!({
            "path": cli.file,
            "start": bag.start_time().map(|t| t.to_string()),
            "end": bag.end_time().map(|t| t.to_string()),
            "duration": duration_of(&bag).map(|t| t.to_string()),
            "chunks": bag.chunk_infos().len(),
            "messages": bag.message_count(),
            "connections": connections,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("path:     {}", cli.file.display());
    match (bag.start_time(), bag.end_time()) {
        (Some(start), Some(end)) => {
            println!("start:    {start}");
            println!("end:      {end}");
            if let Some(duration) = duration_of(&bag) {
                println!("duration: {duration}");
            }
        }
        _ => println!("start:    (empty bag)"),
    }
    println!("chunks:   {}", bag.chunk_infos().len());
    println!("messages: {}", bag.message_count());

    let mut connections: Vec<_> = bag.connections().values().collect();
    connections.sort_by(|a, b| a.topic.cmp(&b.topic));
    for conn in connections {
        println!(
            "  {:<30} {:<30} {:>8} msgs",
            conn.topic,
            conn.message_type,
            counts.get(&conn.conn).copied().unwrap_or(0)
        );
    }

    Ok(())
}

fn duration_of<S: bagcodec::ByteSource>(bag: &Bag<S>) -> Option<Time> {
    match (bag.start_time(), bag.end_time()) {
        (Some(start), Some(end)) => end.sub(start).ok(),
        _ => None,
    }
}
