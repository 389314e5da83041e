use anyhow::Result;
use ganglion::config::GanglionConfig;
use ganglion::vector::{StoreOptions, VectorStore};

/// Display vector index statistics in the terminal.
pub fn stats(config: &GanglionConfig) -> Result<()> {
    let store = VectorStore::open(StoreOptions::from_config(config));
    let stats = store.stats()?;
    let paths = store.paths();

    println!("Vector Index Statistics");
    println!("{}", "=".repeat(40));
    println!("  Vectors:             {}", stats.count);
    println!("  Capacity:            {}", stats.capacity);
    println!("  Dimension:           {}", stats.dimension);
    println!("  Next label:          {}", stats.next_label);
    println!();
    println!("Files:");
    println!("  Index:               {}", describe(&paths.index));
    println!("  ID map:              {}", describe(&paths.map));

    Ok(())
}

fn describe(path: &std::path::Path) -> String {
    match std::fs::metadata(path) {
        Ok(meta) => format!("{} ({} bytes)", path.display(), meta.len()),
        Err(_) => format!("{} (not saved yet)", path.display()),
    }
}
