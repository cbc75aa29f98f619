//! Directives that ship with the crate.

mod class_map;
mod guard;
mod if_defined;
mod live;
mod ref_;
mod repeat;
mod style_map;
mod unsafe_html;
mod until;

pub use class_map::{class_map, ClassMap};
pub use guard::{guard, Guard};
pub use if_defined::if_defined;
pub use live::{live, Live};
pub use ref_::{ref_, Ref, RefDirective};
pub use repeat::{repeat, Repeat};
pub use style_map::{style_map, StyleMap};
pub use unsafe_html::{unsafe_html, unsafe_svg, UnsafeHtml, UnsafeSvg};
pub use until::{until, Pending, Until};
