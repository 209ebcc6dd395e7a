use std::{fs, path::Path};

use team_tasking_core::{Cell, Formation, Pose2};
use tracing::debug;

use crate::FormationError;

/// Parses a formation description, one cell per line.
///
/// Lines follow `id,x,y[,num[,cx,cy]][:label]` with integer fields. Spaces
/// inside the numeric part are ignored and an empty field reads as 0. `#` or
/// `;` starts a comment, and a malformed line is skipped. The label keeps its
/// inner spaces. The pointer defaults to the occupation position per axis.
#[must_use]
pub fn parse_formation(contents: &str) -> Formation {
    let mut cells = Vec::new();

    for (index, line) in contents.lines().enumerate() {
        let content = line
            .split(|c: char| c == '#' || c == ';')
            .next()
            .unwrap_or_default()
            .trim();
        if content.is_empty() {
            continue;
        }

        match parse_cell(content) {
            Some(cell) => cells.push(cell),
            None => debug!(line = index + 1, content, "skipping malformed formation line"),
        }
    }

    Formation::new(cells)
}

/// Reads and parses the formation stored at `path`.
pub fn load_formation_file(path: &Path) -> Result<Formation, FormationError> {
    let contents = fs::read_to_string(path).map_err(|source| FormationError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_formation(&contents))
}

fn parse_cell(content: &str) -> Option<Cell> {
    let (numbers, label) = match content.split_once(':') {
        Some((numbers, label)) => (numbers, label.trim()),
        None => (content, ""),
    };

    let numbers: String = numbers.chars().filter(|c| !c.is_whitespace()).collect();
    let fields = numbers
        .split(',')
        .map(|field| if field.is_empty() { Ok(0) } else { field.parse::<i32>() })
        .collect::<Result<Vec<_>, _>>()
        .ok()?;

    let [id, x, y, rest @ ..] = fields.as_slice() else {
        return None;
    };
    let supporters = u32::try_from(rest.first().copied().unwrap_or(0)).ok()?;
    let pointer_x = rest.get(1).copied().unwrap_or(*x);
    let pointer_y = rest.get(2).copied().unwrap_or(*y);

    Some(Cell::new(
        *id,
        Pose2::new(*x as f32, *y as f32, 0.0),
        Pose2::new(pointer_x as f32, pointer_y as f32, 0.0),
        label,
        supporters,
    ))
}
