pub mod player;
pub mod recorder;

pub use player::PlayerHandle;
pub use recorder::RecorderHandle;
