//! Fieldline Core - value trees and path-addressed structural storage
//!
//! This crate provides the data layer shared by the form engine:
//! - Dynamic value types (`Value`, `ValueMap`) with reference-counted containers
//! - Typed paths (`Path`, `Seg`) parsed from keys like `customers[2].address.city`
//! - Persistent `get_in` / `set_in` that reuse every untouched subtree
//!
//! ## Structural sharing
//!
//! Lists and maps live behind `Rc`, so cloning a value is cheap and a write
//! only copies the containers along the edited path:
//!
//! ```
//! use fieldline_core::{get_in, set_in, Path, Value, ValueMap};
//!
//! let mut address = ValueMap::new();
//! address.insert("city".into(), "Oslo".into());
//! let mut root = ValueMap::new();
//! root.insert("address".into(), Value::from(address));
//! root.insert("tags".into(), Value::from(vec!["a", "b"]));
//! let root = Value::from(root);
//!
//! let next = set_in(&root, &Path::parse("address.city"), Some("Bergen".into()))
//!     .unwrap()
//!     .unwrap();
//!
//! assert_eq!(get_in(&next, &Path::parse("address.city")), Some(&Value::from("Bergen")));
//! // the untouched sibling is the very same allocation
//! let tags = Path::parse("tags");
//! assert!(get_in(&next, &tags).unwrap().identical(get_in(&root, &tags).unwrap()));
//! ```

mod error;
mod path;
mod structure;
mod value;

pub use error::{Error, Result};
pub use path::{Path, Seg};
pub use structure::{get_in, set_in, set_in_pruning};
pub use value::{Value, ValueMap};
