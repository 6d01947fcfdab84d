//! `spec.md` §6 output mechanisms: an XLSX workbook with one sheet per named
//! table, and a set of append-only CSVs under `Results/`. Both are thin
//! adapters over `ledgerlab_node::Statistics` / `Simulation` — the core
//! crates have no file-I/O dependency of their own (§1 Out-of-scope: "result
//! serialization to spreadsheets").

use crate::config::Config;
use ledgerlab_node::{Node, Statistics};
use rust_xlsxwriter::{Workbook, Worksheet};
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to write workbook: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
    #[error("failed to write CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn input_config_sheet(config: &Config) -> Result<Worksheet, Error> {
    let mut sheet = Worksheet::new();
    sheet.set_name("InputConfig")?;
    let rows = [
        ("num_nodes", config.num_nodes.to_string()),
        ("miners_portion", config.miners_portion.to_string()),
        ("b_interval", config.b_interval.to_string()),
        ("b_size", config.b_size.to_string()),
        ("b_reward", config.b_reward.to_string()),
        ("r_reward", config.r_reward.to_string()),
        ("sim_time", config.sim_time.to_string()),
        ("has_trans", config.has_trans.to_string()),
        ("has_redact", config.has_redact.to_string()),
        ("has_multi", config.has_multi.to_string()),
        ("has_smart_contracts", config.has_smart_contracts.to_string()),
    ];
    for (row_idx, (key, value)) in rows.iter().enumerate() {
        sheet.write(row_idx as u32, 0, *key)?;
        sheet.write(row_idx as u32, 1, value.as_str())?;
    }
    Ok(sheet)
}

fn sim_output_sheet(stats: &Statistics) -> Result<Worksheet, Error> {
    let mut sheet = Worksheet::new();
    sheet.set_name("SimOutput")?;
    sheet.write(0, 0, "total_blocks")?;
    sheet.write(0, 1, stats.total_blocks)?;
    sheet.write(1, 0, "main_blocks")?;
    sheet.write(1, 1, stats.main_blocks)?;
    sheet.write(2, 0, "stale_blocks")?;
    sheet.write(2, 1, stats.stale_blocks)?;
    sheet.write(3, 0, "stale_rate")?;
    sheet.write(3, 1, stats.stale_rate())?;
    sheet.write(4, 0, "average_redaction_time_ms")?;
    sheet.write(4, 1, stats.average_redaction_time_ms())?;
    Ok(sheet)
}

fn chain_sheet(name: &str, stats: &Statistics) -> Result<Worksheet, Error> {
    let mut sheet = Worksheet::new();
    sheet.set_name(name)?;
    let header = ["depth", "id", "previous", "timestamp", "miner", "tx_count", "size_mb"];
    for (col, title) in header.iter().enumerate() {
        sheet.write(0, col as u16, *title)?;
    }
    for (row_idx, row) in stats.block_rows.iter().enumerate() {
        let r = row_idx as u32 + 1;
        sheet.write(r, 0, row.depth)?;
        sheet.write(r, 1, row.id.to_string())?;
        sheet.write(r, 2, row.previous.to_string())?;
        sheet.write(r, 3, row.timestamp)?;
        sheet.write(r, 4, row.miner.0)?;
        sheet.write(r, 5, row.tx_count as u32)?;
        sheet.write(r, 6, row.size_mb)?;
    }
    Ok(sheet)
}

fn redact_result_sheet(stats: &Statistics) -> Result<Worksheet, Error> {
    let mut sheet = Worksheet::new();
    sheet.set_name("RedactResult")?;
    let header = ["miner_id", "depth", "tx_id", "reward", "elapsed_ms", "chain_length", "tx_count", "kind"];
    for (col, title) in header.iter().enumerate() {
        sheet.write(0, col as u16, *title)?;
    }
    for (row_idx, row) in stats.redaction_rows.iter().enumerate() {
        let r = row_idx as u32 + 1;
        sheet.write(r, 0, row.miner_id.0)?;
        sheet.write(r, 1, row.depth)?;
        sheet.write(r, 2, row.tx_id.as_str())?;
        sheet.write(r, 3, row.reward)?;
        sheet.write(r, 4, row.elapsed_ms)?;
        sheet.write(r, 5, row.chain_length as u32)?;
        sheet.write(r, 6, row.tx_count as u32)?;
        sheet.write(r, 7, format!("{:?}", row.kind))?;
    }
    Ok(sheet)
}

fn smart_contracts_sheet(stats: &Statistics) -> Result<Worksheet, Error> {
    let mut sheet = Worksheet::new();
    sheet.set_name("SmartContracts")?;
    let header = ["depth", "miner", "contract_address", "method", "gas_used", "success"];
    for (col, title) in header.iter().enumerate() {
        sheet.write(0, col as u16, *title)?;
    }
    for (row_idx, row) in stats.contract_call_rows.iter().enumerate() {
        let r = row_idx as u32 + 1;
        sheet.write(r, 0, row.depth)?;
        sheet.write(r, 1, row.miner.0)?;
        sheet.write(r, 2, row.contract_address.0)?;
        sheet.write(r, 3, row.method.as_str())?;
        sheet.write(r, 4, row.gas_used.unwrap_or(0))?;
        sheet.write(r, 5, row.success.unwrap_or(false))?;
    }
    Ok(sheet)
}

fn contract_summary_sheet(nodes: &[Node]) -> Result<Worksheet, Error> {
    let mut sheet = Worksheet::new();
    sheet.set_name("ContractSummary")?;
    sheet.write(0, 0, "node_id")?;
    sheet.write(0, 1, "deployed_contracts")?;
    for (row_idx, node) in nodes.iter().enumerate() {
        let r = row_idx as u32 + 1;
        sheet.write(r, 0, node.id.0)?;
        sheet.write(r, 1, node.deployed_contracts.len() as u32)?;
    }
    Ok(sheet)
}

fn permission_stats_sheet(stats: &Statistics) -> Result<Worksheet, Error> {
    let mut sheet = Worksheet::new();
    sheet.set_name("PermissionStats")?;
    sheet.write(0, 0, "permission_violations")?;
    sheet.write(0, 1, stats.permission_violations)?;
    let mut row = 1u32;
    for (kind, count) in &stats.redactions_by_type {
        sheet.write(row, 0, format!("redactions_{kind}"))?;
        sheet.write(row, 1, *count)?;
        row += 1;
    }
    for (reason, count) in &stats.redaction_rejections_by_reason {
        sheet.write(row, 0, format!("rejections_{reason}"))?;
        sheet.write(row, 1, *count)?;
        row += 1;
    }
    Ok(sheet)
}

/// Writes the XLSX workbook named `{Bsize_MB}M_{Tn_K}_{Tsize}K.xlsx`
/// (`spec.md` §6), one sheet per named table. `include_pre_redaction_chain`
/// controls whether the optional `ChainBeforeRedaction` sheet is emitted,
/// per the DESIGN NOTES decision that it is only meaningful when redaction
/// actually ran this session.
pub fn write_workbook(
    dir: &Path,
    config: &Config,
    stats: &Statistics,
    nodes: &[Node],
    pre_redaction: Option<&Statistics>,
) -> Result<std::path::PathBuf, Error> {
    std::fs::create_dir_all(dir)?;
    let filename = format!("{}M_{}K_{}K.xlsx", config.b_size, config.t_n, config.t_size);
    let path = dir.join(filename);

    let mut workbook = Workbook::new();
    workbook.push_worksheet(input_config_sheet(config)?);
    workbook.push_worksheet(sim_output_sheet(stats)?);
    workbook.push_worksheet(chain_sheet("Chain", stats)?);
    if let Some(before) = pre_redaction {
        workbook.push_worksheet(chain_sheet("ChainBeforeRedaction", before)?);
    }
    workbook.push_worksheet(redact_result_sheet(stats)?);
    if config.has_smart_contracts {
        workbook.push_worksheet(smart_contracts_sheet(stats)?);
        workbook.push_worksheet(contract_summary_sheet(nodes)?);
    }
    if config.has_permissions {
        workbook.push_worksheet(permission_stats_sheet(stats)?);
    }
    workbook.save(&path)?;
    Ok(path)
}

fn append_csv_row(path: &Path, header: &[&str], row: &[String]) -> Result<(), Error> {
    let write_header = !path.exists();
    let file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
    if write_header {
        writer.write_record(header)?;
    }
    writer.write_record(row)?;
    writer.flush()?;
    Ok(())
}

/// Appends one row to each of the four `Results/` CSVs (`spec.md` §6):
/// `time.csv`, `time_redact.csv`, `block_time.csv`, `profit_redactRuns.csv`.
pub fn append_run_csvs(dir: &Path, run_index: u32, config: &Config, stats: &Statistics) -> Result<(), Error> {
    std::fs::create_dir_all(dir)?;

    append_csv_row(
        &dir.join("time.csv"),
        &["run", "total_blocks", "main_blocks", "stale_blocks", "stale_rate"],
        &[
            run_index.to_string(),
            stats.total_blocks.to_string(),
            stats.main_blocks.to_string(),
            stats.stale_blocks.to_string(),
            format!("{:.6}", stats.stale_rate()),
        ],
    )?;

    append_csv_row(
        &dir.join("time_redact.csv"),
        &["run", "redaction_count", "average_redaction_time_ms"],
        &[
            run_index.to_string(),
            stats.redaction_rows.len().to_string(),
            format!("{:.6}", stats.average_redaction_time_ms()),
        ],
    )?;

    for row in &stats.block_rows {
        append_csv_row(
            &dir.join("block_time.csv"),
            &["run", "depth", "miner", "timestamp"],
            &[run_index.to_string(), row.depth.to_string(), row.miner.0.to_string(), row.timestamp.to_string()],
        )?;
    }

    append_csv_row(
        &dir.join("profit_redactRuns.csv"),
        &["run", "redact_runs", "b_reward", "r_reward"],
        &[run_index.to_string(), config.redact_runs.to_string(), config.b_reward.to_string(), config.r_reward.to_string()],
    )?;

    Ok(())
}
