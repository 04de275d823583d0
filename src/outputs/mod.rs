//! Output generation for the verse dataset.
//!
//! # Submodules
//!
//! - [`json`]: Pretty JSON arrays used for the progress and release snapshots
//! - [`csv`]: Flat CSV export written after a live fetch pass
//! - [`summary`]: Per-chapter expected vs. covered verse report
//!
//! # Output Structure
//!
//! ```text
//! ./
//! ├── gita_verses_progress.json  # rewritten after every insertion
//! ├── gita_verses.json           # written when a pass completes
//! ├── gita_verses.csv            # written after a live fetch pass
//! ├── html_cache/                # 2-47.html, 1-16-18.html
//! └── raw_html/                  # bg_2_47.html
//! ```

pub mod csv;
pub mod json;
pub mod summary;
