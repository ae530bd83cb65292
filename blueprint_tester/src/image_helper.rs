// THEORY:
// Rasterises a blueprint into an RGBA buffer, one `scale`-sized square per
// electrode, and writes it out as PNG. Shanks are laid side by side from the
// lowest shank number, separated by one empty column. The top image row is the
// largest y, so the picture reads like the probe held tip-down.

use image::ImageEncoder;
use probe_blueprint::{Blueprint, Category, GridLookup, UNSET};
use std::path::Path;

const BACKGROUND: [u8; 4] = [0, 0, 0, 255];
const UNSET_COLOR: [u8; 4] = [48, 48, 48, 255];
const PALETTE: [[u8; 4]; 8] = [
    [230, 25, 75, 255],
    [60, 180, 75, 255],
    [255, 225, 25, 255],
    [0, 130, 200, 255],
    [245, 130, 48, 255],
    [145, 30, 180, 255],
    [70, 240, 240, 255],
    [240, 50, 230, 255],
];

pub fn color_of(category: Category) -> [u8; 4] {
    if category == UNSET {
        UNSET_COLOR
    } else {
        PALETTE[(category.unsigned_abs() as usize - 1) % PALETTE.len()]
    }
}

/// Returns `(width, height, rgba)`.
pub fn render(blueprint: &Blueprint, scale: u32) -> (u32, u32, Vec<u8>) {
    let scale = scale.max(1);
    let grid = blueprint.grid();
    let electrodes = grid.electrodes();
    if electrodes.is_empty() {
        return (0, 0, Vec::new());
    }

    let top = electrodes.iter().map(|e| e.y).max().unwrap_or(0);
    let bottom = electrodes.iter().map(|e| e.y).min().unwrap_or(0);

    // Column range and pitch per shank, left to right.
    let mut layout = Vec::new();
    let mut next_column = 0u32;
    let mut rows = 1u32;
    for shank in grid.shanks() {
        let (dx, dy) = grid.pitch(shank);
        let (dx, dy) = (dx.max(1), dy.max(1));
        let xs = electrodes.iter().filter(|e| e.shank == shank).map(|e| e.x);
        let (left, right) = xs.fold((i32::MAX, i32::MIN), |(l, r), x| (l.min(x), r.max(x)));
        let columns = ((right - left) / dx) as u32 + 1;
        rows = rows.max(((top - bottom) / dy) as u32 + 1);
        layout.push((shank, left, dx, dy, next_column));
        next_column += columns + 1;
    }

    let width = (next_column - 1) * scale;
    let height = rows * scale;
    let mut buffer: Vec<u8> = BACKGROUND
        .iter()
        .copied()
        .cycle()
        .take((width * height * 4) as usize)
        .collect();

    for (i, e) in electrodes.iter().enumerate() {
        let Some(&(_, left, dx, dy, first_column)) = layout.iter().find(|l| l.0 == e.shank) else {
            continue;
        };
        let column = first_column + ((e.x - left) / dx) as u32;
        let row = ((top - e.y) / dy) as u32;
        let color = color_of(blueprint.categories()[i]);
        for py in row * scale..(row + 1) * scale {
            for px in column * scale..(column + 1) * scale {
                let at = ((py * width + px) * 4) as usize;
                buffer[at..at + 4].copy_from_slice(&color);
            }
        }
    }

    (width, height, buffer)
}

pub fn save(path: &Path, width: u32, height: u32, buffer: &[u8]) -> Result<(), image::error::ImageError> {
    let output = std::fs::File::create(path)?;
    let encoder = image::codecs::png::PngEncoder::new(output);

    encoder.write_image(buffer, width, height, image::ExtendedColorType::Rgba8)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use probe_blueprint::{ElectrodeGrid, ElectrodeSelector};
    use std::sync::Arc;

    #[test]
    fn render_lays_out_shanks() {
        let grid = Arc::new(ElectrodeGrid::rectangular(2, 3, 2, 32, 15));
        let mut bp = Blueprint::new(grid);
        bp.set(1, &ElectrodeSelector::Index(vec![0])).unwrap();

        let (width, height, buffer) = render(&bp, 4);
        // Two columns per shank plus one separator.
        assert_eq!(width, 5 * 4);
        assert_eq!(height, 3 * 4);
        assert_eq!(buffer.len(), (width * height * 4) as usize);

        // Electrode 0 is the bottom-left cell.
        let at = (((height - 1) * width) * 4) as usize;
        assert_eq!(&buffer[at..at + 4], &color_of(1));
        // Separator column stays background.
        let at = ((2 * 4) * 4) as usize;
        assert_eq!(&buffer[at..at + 4], &BACKGROUND);
    }

    #[test]
    fn unset_and_set_colors_differ() {
        assert_ne!(color_of(UNSET), color_of(1));
        assert_ne!(color_of(1), color_of(2));
        assert_eq!(color_of(1), color_of(9));
    }

    #[test]
    fn save_blueprint_png() {
        let grid = Arc::new(ElectrodeGrid::rectangular(1, 10, 4, 16, 20));
        let mut bp = Blueprint::new(grid);
        bp.set(2, &ElectrodeSelector::predicate(|e| e.y >= 100)).unwrap();
        let (width, height, buffer) = render(&bp, 8);

        let path = std::env::temp_dir().join("blueprint_tester_save.png");
        save(&path, width, height, &buffer).expect("Error Saving File.");
        let decoded = image::open(&path).expect("readable png");
        assert_eq!((decoded.width(), decoded.height()), (width, height));
        let _ = std::fs::remove_file(path);
    }
}
