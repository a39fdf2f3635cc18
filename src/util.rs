/// Renders whole seconds as zero-padded `mm:ss`
pub fn format_clock(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Wins as a rounded percentage of games, 0 when nothing has been played
pub fn win_rate_percent(wins: u64, games: u64) -> u64 {
    match games {
        0 => 0,
        games => ((wins as f64 / games as f64) * 100.0).round() as u64,
    }
}
