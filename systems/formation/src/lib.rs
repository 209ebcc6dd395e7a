#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Formation descriptions, the catalog they are loaded into, and the
//! edge-triggered selection of the active formation.

mod parser;

use std::{
    collections::BTreeMap,
    fmt,
    path::{Path, PathBuf},
};

use team_tasking_core::{Formation, GamePhase};
use thiserror::Error;
use tracing::{debug, info};

pub use parser::{load_formation_file, parse_formation};

const FILE_PREFIX: &str = "formation_";
const FILE_EXTENSION: &str = ".cfg";
const KICKOFF_TAG: &str = "kickoffus";
const PLAYER_SUFFIX: &str = "player";

/// Errors raised while loading or selecting formations.
#[derive(Debug, Error)]
pub enum FormationError {
    /// A formation file could not be read.
    #[error("could not read formation file {}", path.display())]
    Io {
        /// File that failed to open.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// No cataloged formation matches the selection key.
    #[error("no formation named {key} in the catalog")]
    Missing {
        /// File name the selection resolved to.
        key: String,
    },
    /// A file name does not follow the formation naming convention.
    #[error(
        "formation file name {} does not match formation_<ready|playing>_<N>player[_kickoffus]_<version>.cfg",
        path.display()
    )]
    UnrecognisedFileName {
        /// Offending file.
        path: PathBuf,
    },
}

/// Phase tag used in formation names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FormationPhase {
    /// Walking to or standing at kickoff positions.
    Ready,
    /// Live play.
    Playing,
}

impl FormationPhase {
    /// Tag of the formation used during `phase`.
    #[must_use]
    pub const fn for_game_phase(phase: GamePhase) -> Self {
        if phase.is_pre_play() {
            Self::Ready
        } else {
            Self::Playing
        }
    }

    const fn tag(self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Playing => "playing",
        }
    }
}

/// Lookup key of a cataloged formation, rendered as its file name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FormationKey {
    /// Phase tag.
    pub phase: FormationPhase,
    /// Active player count the formation is sized for.
    pub players: usize,
    /// Whether the formation is used while the local team holds the kickoff.
    pub kickoff_us: bool,
    /// Formation version tag.
    pub version: u32,
}

impl FormationKey {
    /// Builds the key for the given game situation.
    #[must_use]
    pub const fn select(phase: GamePhase, kickoff_us: bool, players: usize, version: u32) -> Self {
        Self {
            phase: FormationPhase::for_game_phase(phase),
            players,
            kickoff_us,
            version,
        }
    }

    /// Recovers a key from a file name such as `formation_ready_4player_kickoffus_1.cfg`.
    #[must_use]
    pub fn parse_file_name(name: &str) -> Option<Self> {
        let stem = name
            .strip_prefix(FILE_PREFIX)?
            .strip_suffix(FILE_EXTENSION)?;
        let parts: Vec<&str> = stem.split('_').collect();

        let (phase, players, kickoff_us, version) = match parts.as_slice() {
            [phase, players, version] => (*phase, *players, false, *version),
            [phase, players, kickoff, version] if *kickoff == KICKOFF_TAG => {
                (*phase, *players, true, *version)
            }
            _ => return None,
        };

        let phase = match phase {
            "ready" => FormationPhase::Ready,
            "playing" => FormationPhase::Playing,
            _ => return None,
        };
        let players = players.strip_suffix(PLAYER_SUFFIX)?.parse().ok()?;
        let version = version.parse().ok()?;

        Some(Self {
            phase,
            players,
            kickoff_us,
            version,
        })
    }

    /// File name the key is stored under.
    #[must_use]
    pub fn file_name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for FormationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kickoff = if self.kickoff_us { "_kickoffus" } else { "" };
        write!(
            f,
            "{FILE_PREFIX}{}_{}{PLAYER_SUFFIX}{kickoff}_{}{FILE_EXTENSION}",
            self.phase.tag(),
            self.players,
            self.version
        )
    }
}

/// Every formation known to one agent, keyed by selection key.
#[derive(Clone, Debug, Default)]
pub struct FormationCatalog {
    formations: BTreeMap<FormationKey, Formation>,
}

impl FormationCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `formation` under `key`, replacing any earlier entry.
    pub fn insert(&mut self, key: FormationKey, formation: Formation) {
        if self.formations.insert(key, formation).is_some() {
            debug!(%key, "replaced cataloged formation");
        }
    }

    /// Loads one formation file, keyed by its file name.
    pub fn load_file(&mut self, path: &Path) -> Result<FormationKey, FormationError> {
        let key = path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(FormationKey::parse_file_name)
            .ok_or_else(|| FormationError::UnrecognisedFileName {
                path: path.to_path_buf(),
            })?;

        let formation = load_formation_file(path)?;
        debug!(%key, cells = formation.len(), "loaded formation");
        self.insert(key, formation);
        Ok(key)
    }

    /// Eagerly loads every file whose name follows the formation convention.
    ///
    /// Other files are skipped; a file that cannot be read aborts loading.
    pub fn load_files<I, P>(paths: I) -> Result<Self, FormationError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut catalog = Self::new();
        for path in paths {
            match catalog.load_file(path.as_ref()) {
                Ok(_) => {}
                Err(FormationError::UnrecognisedFileName { path }) => {
                    debug!(path = %path.display(), "skipping file outside the formation naming scheme");
                }
                Err(error) => return Err(error),
            }
        }
        info!(formations = catalog.len(), "formation catalog loaded");
        Ok(catalog)
    }

    /// Formation stored under `key`.
    pub fn get(&self, key: &FormationKey) -> Result<&Formation, FormationError> {
        self.formations
            .get(key)
            .ok_or_else(|| FormationError::Missing {
                key: key.file_name(),
            })
    }

    /// Mirrors every cell of every cataloged formation across the longitudinal axis.
    pub fn mirror_all(&mut self) {
        for formation in self.formations.values_mut() {
            formation.mirror_y();
        }
        debug!(formations = self.formations.len(), "mirrored formation catalog");
    }

    /// Keys of the cataloged formations in ascending order.
    pub fn keys(&self) -> impl Iterator<Item = &FormationKey> {
        self.formations.keys()
    }

    /// Number of cataloged formations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.formations.len()
    }

    /// Reports whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.formations.is_empty()
    }
}

/// Remembers the inputs of the last selection so the formation is only
/// replaced when the game phase, kickoff side, player count or version changes.
#[derive(Clone, Debug, Default)]
pub struct FormationSelector {
    last: Option<(GamePhase, FormationKey)>,
}

impl FormationSelector {
    /// Creates a selector that has not selected anything yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Key of the formation selected last, if any.
    #[must_use]
    pub fn current(&self) -> Option<FormationKey> {
        self.last.map(|(_, key)| key)
    }

    /// Returns the newly selected formation when the inputs changed since the
    /// last successful selection, `None` when nothing changed.
    ///
    /// A missing formation is reported every cycle until the inputs resolve
    /// to a cataloged key.
    pub fn reselect<'a>(
        &mut self,
        phase: GamePhase,
        kickoff_us: bool,
        players: usize,
        version: u32,
        catalog: &'a FormationCatalog,
    ) -> Result<Option<&'a Formation>, FormationError> {
        let key = FormationKey::select(phase, kickoff_us, players, version);
        if self.last == Some((phase, key)) {
            return Ok(None);
        }

        let formation = catalog.get(&key)?;
        debug!(%key, ?phase, "selected formation");
        self.last = Some((phase, key));
        Ok(Some(formation))
    }
}
