//! Vector store summary for `docqa stats`.

use anyhow::Result;

use crate::config::Config;
use crate::sqlite_store::SqliteStore;

/// Print record counts, sources, and the embedding model of the store.
pub async fn run_stats(config: &Config) -> Result<()> {
    let path = config.store_file();
    let store = SqliteStore::open_existing(&path);
    let stats = store.stats().await;
    store.close().await;
    let stats = stats?;

    let db_size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);

    println!("docqa store stats");
    println!("=================");
    println!();
    println!("  Store:       {}", path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!(
        "  Model:       {}",
        stats.embedding_model.as_deref().unwrap_or("(none)")
    );
    if let Some(dims) = stats.dims {
        println!("  Dimensions:  {}", dims);
    }
    println!("  Records:     {}", stats.records);

    if !stats.sources.is_empty() {
        println!();
        println!("  {:<48} {:>8}", "SOURCE", "RECORDS");
        println!("  {}", "-".repeat(57));
        for (source, count) in &stats.sources {
            println!("  {:<48} {:>8}", source, count);
        }
    }
    println!();

    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }
}
