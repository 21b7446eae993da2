//! asdomain core
//!
//! Domain model, KDL configuration parsing and the pure decision logic
//! (secret policy, privileged-port policy, asadmin command construction,
//! service unit rendering) shared by the convergence engine.

pub mod asadmin;
pub mod error;
pub mod model;
pub mod parser;
pub mod privilege;
pub mod secret;
pub mod template;
pub mod unit;

pub use asadmin::{Asadmin, CommandLine};
pub use error::{CoreError, Result};
pub use model::*;
pub use parser::{parse_kdl_file, parse_kdl_string};
pub use template::TemplateProcessor;
pub use unit::{UnitContent, UnitKind, UnitSelection, render_unit};
