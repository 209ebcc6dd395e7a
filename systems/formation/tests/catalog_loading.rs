use std::fs;

use team_tasking_core::{GamePhase, Vec2};
use team_tasking_system_formation::{FormationCatalog, FormationError, FormationKey};

const FOUR_PLAYER_READY: &str = "\
# goalkeeper excluded, four field cells
0,-3500,0:GK
1,-2000,1000,1
2,-2000,-1000
3,-800,0,0,-600,200:DF
";

#[test]
fn catalog_loads_every_conforming_file() {
    let dir = tempfile::tempdir().expect("temporary directory");
    let ready = dir.path().join("formation_ready_4player_kickoffus_1.cfg");
    let playing = dir.path().join("formation_playing_4player_1.cfg");
    let notes = dir.path().join("README.txt");
    fs::write(&ready, FOUR_PLAYER_READY).expect("write ready formation");
    fs::write(&playing, "0,-1000,0\n1,0,0\n2,1000,0\n3,2000,0\n").expect("write playing formation");
    fs::write(&notes, "not a formation").expect("write notes");

    let catalog =
        FormationCatalog::load_files([&ready, &playing, &notes]).expect("catalog loads");

    assert_eq!(catalog.len(), 2);
    let key = FormationKey::select(GamePhase::Ready, true, 4, 1);
    let formation = catalog.get(&key).expect("ready formation");
    assert_eq!(formation.len(), 4);
    assert_eq!(
        formation.cell(3).map(|cell| cell.pointer().translation()),
        Some(Vec2::new(-600.0, 200.0))
    );
    assert!(catalog
        .get(&FormationKey::select(GamePhase::Playing, false, 4, 1))
        .is_ok());
}

#[test]
fn unreadable_formation_aborts_loading() {
    let dir = tempfile::tempdir().expect("temporary directory");
    let missing = dir.path().join("formation_ready_2player_1.cfg");

    let error = FormationCatalog::load_files([&missing]).expect_err("file does not exist");
    assert!(matches!(error, FormationError::Io { .. }));
}

#[test]
fn single_file_loading_rejects_foreign_names() {
    let dir = tempfile::tempdir().expect("temporary directory");
    let path = dir.path().join("lineup.cfg");
    fs::write(&path, "0,0,0\n").expect("write file");

    let mut catalog = FormationCatalog::new();
    let error = catalog.load_file(&path).expect_err("name does not conform");
    assert!(matches!(error, FormationError::UnrecognisedFileName { .. }));
    assert!(catalog.is_empty());
}
