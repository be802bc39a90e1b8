pub mod parallel;
pub mod params;
