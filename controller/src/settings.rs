use std::{
    fs::{
        File,
        OpenOptions,
    },
    io::{
        BufReader,
        BufWriter,
    },
    path::{
        Path,
        PathBuf,
    },
};

use anyhow::Context;
use raid::RadarSettings;
use serde::{
    Deserialize,
    Serialize,
};

fn default_usize<const V: usize>() -> usize {
    V
}

fn default_u64<const V: u64>() -> u64 {
    V
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct AppSettings {
    #[serde(default)]
    pub radar: RadarSettings,

    /// Realtime tick of the render loop
    #[serde(default = "default_u64::<16>")]
    pub tick_ms: u64,

    /// Log the entity snapshot every n frames (zero disables it)
    #[serde(default = "default_usize::<60>")]
    pub snapshot_interval: usize,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            radar: RadarSettings::default(),
            tick_ms: 16,
            snapshot_interval: 60,
        }
    }
}

impl AppSettings {
    /// Default config location: `config.yaml` next to the executable
    pub fn default_path() -> anyhow::Result<PathBuf> {
        let executable = std::env::current_exe().context("missing current exe path")?;
        let directory = executable
            .parent()
            .context("could not get exe directory")?;

        Ok(directory.join("config.yaml"))
    }

    /// Load the settings from `path`, using the defaults if there is no such file.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.is_file() {
            log::info!("No config at {}. Using defaults.", path.display());
            return Ok(Self::default());
        }

        let reader = BufReader::new(open_config(path, File::options().read(true))?);
        let settings = serde_yaml::from_reader(reader)
            .with_context(|| format!("failed to parse config {}", path.display()))?;

        log::info!("Loaded config from {}", path.display());
        Ok(settings)
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        let file = open_config(path, File::options().create(true).truncate(true).write(true))?;
        serde_yaml::to_writer(BufWriter::new(file), self)
            .with_context(|| format!("failed to write config {}", path.display()))?;

        log::debug!("Saved config to {}", path.display());
        Ok(())
    }
}

fn open_config(path: &Path, options: &OpenOptions) -> anyhow::Result<File> {
    options
        .open(path)
        .with_context(|| format!("failed to open config {}", path.display()))
}
