fn main() {
    println!("sqmtables-rs - SqueezeMeta table aggregation");
    println!();
    println!("Tools:");
    println!("  make_tables  - Build functional and taxonomic abundance tables for a project");
    println!("  sqm_lineage  - Resolve taxonomy strings into seven-rank lineages (TSV)");
    println!();
    println!("For help with each tool:");
    println!("  cargo run --bin make_tables -- --help");
    println!("  cargo run --bin sqm_lineage -- --help");
    println!();
    println!("Quick start example:");
    println!("  cargo run --bin make_tables -- /data/lake /data/lake/results/tables -v");
}
