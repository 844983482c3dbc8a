pub mod load_csv;
pub mod weather_csv;

pub use load_csv::{read_load_csv, LoadFrame};
pub use weather_csv::{read_weather_csv, WeatherFrame};
