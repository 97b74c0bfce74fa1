pub mod step_up;
pub mod whoami;

pub use step_up::step_up_post;
pub use whoami::whoami_get;
