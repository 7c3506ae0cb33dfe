//! Report generation: CSV tables and the Markdown weekly report.
//!
//! # Submodules
//!
//! - [`csv`]: Writes articles, entities, and insights as UTF-8 CSV (with BOM)
//! - [`markdown`]: Renders the human-readable weekly report
//!
//! # Output Structure
//!
//! ```text
//! outdir/
//! ├── articles_2025-06-09.csv
//! ├── entities_2025-06-09.csv
//! ├── insights_2025-06-09.csv
//! └── weekly_report_2025-06-09.md
//! ```

pub mod csv;
pub mod markdown;
