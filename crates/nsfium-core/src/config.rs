pub mod player;
pub mod region;

pub use player::PlayerConfig;
pub use region::Region;
