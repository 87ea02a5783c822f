//! Reads product catalogs from disk.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tourbot_core::CatalogEntry;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported catalog format {0:?}, expected .json or .txt")]
    UnsupportedFormat(String),

    #[error("invalid JSON catalog: {0}")]
    Json(#[from] serde_json::Error),

    #[error("product block {block} is missing {field}")]
    MissingField { block: usize, field: &'static str },

    #[error("catalog {0} contains no products")]
    Empty(PathBuf),
}

const NAME_LABELS: &[&str] = &["产品名称", "名称"];
const PRICE_LABELS: &[&str] = &["产品价格", "价格"];
const ITINERARY_LABELS: &[&str] = &["行程安排", "行程"];
const DESTINATION_LABELS: &[&str] = &["目的地"];

/// Load a catalog, choosing the format by file extension.
pub fn load_catalog(path: &Path) -> Result<Vec<CatalogEntry>, CatalogError> {
    if !path.exists() {
        return Err(CatalogError::NotFound(path.to_path_buf()));
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let text = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let entries = match extension.as_str() {
        "json" => parse_json(&text)?,
        "txt" | "md" => parse_labelled(&text)?,
        other => return Err(CatalogError::UnsupportedFormat(other.to_string())),
    };

    if entries.is_empty() {
        return Err(CatalogError::Empty(path.to_path_buf()));
    }
    info!("Loaded {} products from {}", entries.len(), path.display());
    Ok(entries)
}

pub fn parse_json(text: &str) -> Result<Vec<CatalogEntry>, CatalogError> {
    Ok(serde_json::from_str(text)?)
}

/// Parse `label：value` blocks separated by blank lines.
///
/// Unlabelled lines continue the previous field, so multi-line itineraries
/// are kept together.
pub fn parse_labelled(text: &str) -> Result<Vec<CatalogEntry>, CatalogError> {
    let normalized = text.replace("\r\n", "\n");
    let mut entries = Vec::new();

    for (index, block) in normalized
        .split("\n\n")
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .enumerate()
    {
        let block_no = index + 1;
        let mut fields = BlockFields::default();
        let mut current: Option<Field> = None;

        for line in block.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if let Some((field, value)) = split_label(line) {
                fields.set(field, value);
                current = Some(field);
            } else if let Some(field) = current {
                fields.append(field, line);
            } else {
                debug!("Skipping unlabelled line in block {block_no}: {line}");
            }
        }

        entries.push(fields.into_entry(block_no)?);
    }

    Ok(entries)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Name,
    Price,
    Itinerary,
    Destinations,
}

#[derive(Default)]
struct BlockFields {
    name: Option<String>,
    price: Option<String>,
    itinerary: Option<String>,
    destinations: Option<String>,
}

impl BlockFields {
    fn slot(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::Name => &mut self.name,
            Field::Price => &mut self.price,
            Field::Itinerary => &mut self.itinerary,
            Field::Destinations => &mut self.destinations,
        }
    }

    fn set(&mut self, field: Field, value: &str) {
        *self.slot(field) = Some(value.to_string());
    }

    fn append(&mut self, field: Field, line: &str) {
        let slot = self.slot(field);
        if let Some(existing) = slot.as_mut().filter(|e| !e.is_empty()) {
            existing.push('\n');
            existing.push_str(line);
        } else {
            *slot = Some(line.to_string());
        }
    }

    fn into_entry(self, block: usize) -> Result<CatalogEntry, CatalogError> {
        let required = |value: Option<String>, field| {
            value
                .filter(|v| !v.trim().is_empty())
                .ok_or(CatalogError::MissingField { block, field })
        };
        let name = required(self.name, "产品名称")?;
        let price = required(self.price, "价格")?;
        let itinerary = self.itinerary.unwrap_or_default();
        let destinations = self
            .destinations
            .map(|d| split_destinations(&d))
            .unwrap_or_default();

        Ok(CatalogEntry::new(name, price, itinerary).with_destinations(destinations))
    }
}

fn split_label(line: &str) -> Option<(Field, &str)> {
    let (label, value) = line
        .split_once('：')
        .or_else(|| line.split_once(':'))?;
    let label = label.trim();
    let field = if NAME_LABELS.contains(&label) {
        Field::Name
    } else if PRICE_LABELS.contains(&label) {
        Field::Price
    } else if ITINERARY_LABELS.contains(&label) {
        Field::Itinerary
    } else if DESTINATION_LABELS.contains(&label) {
        Field::Destinations
    } else {
        return None;
    };
    Some((field, value.trim()))
}

fn split_destinations(raw: &str) -> Vec<String> {
    raw.split(['、', '，', ',', '/', ' '])
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = "产品名称：北京故宫深度一日游\n价格：399元\n目的地：北京、故宫\n行程安排：上午午门入宫\n下午神武门出\n\n\
产品名称：杭州西湖两日游\n产品价格：899元\n目的地：杭州、西湖\n行程安排：苏堤漫步";

    #[test]
    fn parses_labelled_blocks() {
        let Ok(entries) = parse_labelled(SAMPLE) else {
            panic!("sample catalog should parse");
        };
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "北京故宫深度一日游");
        assert_eq!(entries[0].price, "399元");
        assert_eq!(entries[0].destinations, vec!["北京", "故宫"]);
        assert_eq!(entries[0].itinerary, "上午午门入宫\n下午神武门出");
        assert_eq!(entries[1].price, "899元");
    }

    #[test]
    fn missing_price_names_block() {
        let result = parse_labelled("产品名称：A\n\n产品名称：B\n价格：1");
        assert!(matches!(
            result,
            Err(CatalogError::MissingField {
                block: 1,
                field: "价格"
            })
        ));
    }

    #[test]
    fn json_accepts_numeric_price() {
        let Ok(entries) =
            parse_json(r#"[{"name": "兵马俑一日游", "price": 299, "itinerary": "临潼"}]"#)
        else {
            panic!("numeric price should parse");
        };
        assert_eq!(entries[0].price, "299");
        assert!(entries[0].destinations.is_empty());
    }

    #[test]
    fn load_by_extension() {
        let Ok(dir) = tempfile::tempdir() else {
            panic!("temp dir should be created");
        };
        let txt = dir.path().join("product.txt");
        let Ok(mut file) = std::fs::File::create(&txt) else {
            panic!("catalog file should be created");
        };
        assert!(file.write_all(SAMPLE.as_bytes()).is_ok());
        assert!(matches!(load_catalog(&txt), Ok(entries) if entries.len() == 2));

        let csv = dir.path().join("product.csv");
        assert!(std::fs::write(&csv, "a,b").is_ok());
        assert!(matches!(
            load_catalog(&csv),
            Err(CatalogError::UnsupportedFormat(_))
        ));

        let empty = dir.path().join("empty.json");
        assert!(std::fs::write(&empty, "[]").is_ok());
        assert!(matches!(load_catalog(&empty), Err(CatalogError::Empty(_))));

        assert!(matches!(
            load_catalog(&dir.path().join("missing.txt")),
            Err(CatalogError::NotFound(_))
        ));
    }
}
