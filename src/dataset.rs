use std::fs::File;
use std::io::Read;

use camino::{Utf8Path, Utf8PathBuf};
use csv::ReaderBuilder;
use tracing::debug;

use crate::domain::{GeneMap, UniparcId, WorkPlan};
use crate::error::KiraError;

pub const GENE_COLUMN: &str = "SYMBOL";
pub const IDENTIFIER_COLUMN: &str = "UNIPARC";

/// Reads the tab-separated gene table into a work plan.
pub struct DatasetReader;

impl DatasetReader {
    pub fn read(path: &Utf8Path) -> Result<WorkPlan, KiraError> {
        Self::read_gene_map(path).map(WorkPlan::from)
    }

    pub fn read_gene_map(path: &Utf8Path) -> Result<GeneMap, KiraError> {
        let file = File::open(path.as_std_path()).map_err(|err| KiraError::TableRead {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        let map = Self::from_reader(file, path)?;
        debug!(genes = map.len(), path = %path, "gene table loaded");
        Ok(map)
    }

    pub fn from_reader<R: Read>(reader: R, source: &Utf8Path) -> Result<GeneMap, KiraError> {
        let table_err = |err: csv::Error| KiraError::TableRead {
            path: Utf8PathBuf::from(source),
            message: err.to_string(),
        };

        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .delimiter(b'\t')
            .from_reader(reader);

        let headers = rdr.headers().map_err(table_err)?.clone();
        let column = |name: &str| {
            headers
                .iter()
                .position(|header| header.trim() == name)
                .ok_or_else(|| KiraError::MissingColumn(name.to_string()))
        };
        let id_col = column(IDENTIFIER_COLUMN)?;
        let gene_col = column(GENE_COLUMN)?;

        let mut map = GeneMap::new();
        for (idx, result) in rdr.records().enumerate() {
            let record = result.map_err(table_err)?;
            // header is line 1
            let row = idx + 2;
            let gene = record.get(gene_col).unwrap_or("").trim();
            if gene.is_empty() {
                return Err(KiraError::TableRow {
                    row,
                    message: format!("empty {GENE_COLUMN} value"),
                });
            }
            // the gene ends up in a FASTA header line and in the `gene\tid` marker
            if let Some(bad) = gene.chars().find(|c| c.is_control() || *c == '|') {
                return Err(KiraError::TableRow {
                    row,
                    message: format!("{GENE_COLUMN} value {gene:?} contains {bad:?}"),
                });
            }
            let identifier =
                UniparcId::parse_cell(record.get(id_col).unwrap_or("")).map_err(|err| {
                    KiraError::TableRow {
                        row,
                        message: err.to_string(),
                    }
                })?;
            map.push(gene, identifier);
        }
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns_are_found_by_name_not_position() {
        let table = "UNIPARC\tCHROM\tSYMBOL\nUPI0000000001\t17\tTP53\n";
        let map = DatasetReader::from_reader(table.as_bytes(), Utf8Path::new("mem.tsv")).unwrap();
        let ids = map.identifiers("TP53").unwrap();
        assert_eq!(ids.len(), 1);
        assert_eq!(ids[0].as_ref().unwrap().as_str(), "UPI0000000001");
    }
}
