/// Wall-clock time as shown on the dashboard (`HH:MM:SS`, local time).
pub fn display_time() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}
