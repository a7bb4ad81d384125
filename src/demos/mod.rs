//! Sample client programs of the page-fault weird machine, built entirely
//! through `wm`'s public API (§1: "A `movdbz` sample program ... is
//! described only as an example client of the core, not as part of the
//! core").

pub mod echo_repl;
