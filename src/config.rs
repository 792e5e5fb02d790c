use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    /// Directories scanned recursively for music assets.
    pub music_dirs: Vec<PathBuf>,
    /// Directory containing per-period segment sub-folders (station IDs, hour markers, etc).
    pub segments_dir: PathBuf,
    /// Flat directory of podcast episode files.
    pub podcasts_dir: PathBuf,
    /// Path to the YAML weekly schedule. Absent file falls back to the synthetic schedule.
    pub schedule_path: PathBuf,

    pub icecast_host: String,
    pub icecast_port: u16,
    pub icecast_mount: String,
    pub icecast_user: String,
    pub icecast_pass: String,
    pub icecast_status_url: String,

    /// Paths the now-playing state is published to (atomically).
    pub now_playing_paths: Vec<PathBuf>,
    /// Single-slot command file polled by the streaming engine.
    pub command_file: PathBuf,
    /// Listener message ring file.
    pub messages_path: PathBuf,
    /// Local SQLite play history database.
    pub history_db_path: PathBuf,
    /// Discogs side-car lookup cache directory.
    pub discogs_cache_dir: PathBuf,

    pub server_host: String,
    pub server_port: u16,

    /// Webhook hit on supervisor escalation alerts (optional).
    pub supervisor_alert_webhook: Option<String>,
    /// Public page URL template (`{path}` substituted) the /qr endpoint encodes.
    pub qr_target_template: String,
    /// Status URL for the tunnel/edge proxy fronting the HTTP API
    /// (optional; the Supervisor only monitors this component when set).
    pub tunnel_status_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let home = env::var("HOME").unwrap_or_else(|_| "/root".to_string());
        let wvoid_home = PathBuf::from(&home).join(".wvoid");

        let archive_music_dir = env::var("WVOID_ARCHIVE_MUSIC_DIR")
            .unwrap_or_else(|_| "/Volumes/Archive/01_COLD_ARCHIVE/Media/Music".to_string());

        let music_dirs: Vec<PathBuf> = match env::var("WVOID_MUSIC_DIRS") {
            Ok(val) => env::split_paths(&val).collect(),
            Err(_) => vec![PathBuf::from(archive_music_dir)],
        };
        if music_dirs.is_empty() {
            return Err(anyhow::anyhow!("WVOID_MUSIC_DIRS must name at least one directory"));
        }

        let icecast_host = env::var("ICECAST_HOST").unwrap_or_else(|_| "localhost".to_string());
        let icecast_port: u16 = env::var("ICECAST_PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse()
            .map_err(|_| anyhow::anyhow!("ICECAST_PORT must be a valid port number"))?;
        let icecast_status_url = env::var("ICECAST_STATUS_URL").unwrap_or_else(|_| {
            format!("http://{}:{}/status-json.xsl", icecast_host, icecast_port)
        });

        let now_playing_paths = env::var("WVOID_NOW_PLAYING_PATHS")
            .ok()
            .map(|raw| env::split_paths(&raw).collect())
            .unwrap_or_else(|| vec![wvoid_home.join("now_playing.json")]);

        Ok(Config {
            music_dirs,
            segments_dir: env::var("WVOID_SEGMENTS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("segments")),
            podcasts_dir: env::var("WVOID_PODCASTS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("podcasts")),
            schedule_path: env::var("WVOID_SCHEDULE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("schedule.yaml")),

            icecast_host,
            icecast_port,
            icecast_mount: env::var("ICECAST_MOUNT").unwrap_or_else(|_| "/stream".to_string()),
            icecast_user: env::var("ICECAST_USER").unwrap_or_else(|_| "source".to_string()),
            icecast_pass: env::var("ICECAST_PASS")
                .map_err(|_| anyhow::anyhow!("ICECAST_PASS must be set"))?,
            icecast_status_url,

            now_playing_paths,
            command_file: env::var("WVOID_COMMAND_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| wvoid_home.join("command.txt")),
            messages_path: env::var("WVOID_MESSAGES_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| wvoid_home.join("messages.json")),
            history_db_path: env::var("WVOID_HISTORY_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| wvoid_home.join("history.db")),
            discogs_cache_dir: env::var("WVOID_DISCOGS_CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| wvoid_home.join("discogs")),

            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("WVOID_NOW_PLAYING_PORT")
                .unwrap_or_else(|_| "8001".to_string())
                .parse()
                .unwrap_or(8001),

            supervisor_alert_webhook: env::var("SUPERVISOR_ALERT_WEBHOOK").ok(),
            qr_target_template: env::var("WVOID_QR_TARGET_TEMPLATE")
                .unwrap_or_else(|_| "https://wvoid.fm/now-playing".to_string()),
            tunnel_status_url: env::var("WVOID_TUNNEL_STATUS_URL").ok(),
        })
    }

    pub fn icecast_source_url(&self) -> String {
        format!(
            "icecast://{}:{}@{}:{}{}",
            self.icecast_user, self.icecast_pass, self.icecast_host, self.icecast_port, self.icecast_mount
        )
    }
}
