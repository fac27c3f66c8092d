//! XML interchange format.
//!
//! ```xml
//! <ts xmlns:ts="http://www.unamur.be/xml/ts/">
//!   <start>state0</start>
//!   <states>
//!     <state id="state0">
//!       <transition action="move" target="state1" />
//!     </state>
//!     <state id="state1" />
//!   </states>
//! </ts>
//! ```

mod read;
mod write;

pub use read::{from_file, parse, parse_with};
pub use write::to_xml;
