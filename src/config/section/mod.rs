//! Configuration section definitions.
//!
//! Each module corresponds to a section in `docserve.toml`:
//!
//! | Module  | TOML Section | Purpose                                 |
//! |---------|--------------|-----------------------------------------|
//! | `serve` | `[serve]`    | Served root, watched dirs, build, polls |

mod serve;

pub use serve::ServeConfig;
