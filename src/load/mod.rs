//! Stage ramp and the task that publishes the live VU target.
mod controller;
mod profile;


pub use controller::spawn_load_controller;
pub use profile::LoadProfile;
