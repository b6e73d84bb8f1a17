//! A square matrix of misclassification costs,
//! indexed by `[true class][predicted class]`.
use serde::{Serialize, Deserialize};
use rand::Rng;
use log::debug;

use std::fmt;
use std::fs;
use std::path::Path;

use crate::{
    Dataset,
    error::{EnsembleError, Result},
};


/// Misclassification costs.
/// `get(i, j)` is the cost of predicting class `j`
/// for an instance of class `i`.
///
/// Three text formats are understood:
/// - [`CostMatrix::parse`]: a `rows columns` header followed by the
///   entries row by row, with `%` starting a comment,
/// - [`CostMatrix::parse_matlab`]: a single-line literal like `[0 1; 5 0]`,
/// - [`CostMatrix::parse_old_format`]: lines of
///   `true-class predicted-class cost` triples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<f64>>", into = "Vec<Vec<f64>>")]
pub struct CostMatrix {
    cells: Vec<Vec<f64>>,
}


fn cost_error<R: ToString>(reason: R) -> EnsembleError {
    EnsembleError::CostMatrix { reason: reason.to_string() }
}


fn parse_number(token: &str) -> Result<f64> {
    token.parse::<f64>()
        .map_err(|_| cost_error(format!("`{token}` is not a number")))
}


impl CostMatrix {
    /// The `size x size` matrix with zero diagonal
    /// and unit cost everywhere else.
    pub fn new(size: usize) -> Self {
        let cells = (0..size)
            .map(|i| {
                (0..size)
                    .map(|j| if i == j { 0f64 } else { 1f64 })
                    .collect()
            })
            .collect();
        Self { cells }
    }


    /// Construct a matrix from its rows.
    /// The rows must form a non-empty square matrix.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let size = rows.len();
        if size == 0 {
            return Err(cost_error("matrix is empty"));
        }
        if rows.iter().any(|row| row.len() != size) {
            return Err(cost_error("cost matrix is not square"));
        }
        Ok(Self { cells: rows })
    }


    /// Parses the text format written by [`fmt::Display`].
    ///
    /// ```text
    /// % Rows	Columns
    /// 2	2
    /// % Matrix elements
    /// 0	1
    /// 5	0
    /// ```
    pub fn parse(text: &str) -> Result<Self> {
        let tokens = text.lines()
            .map(|line| line.split('%').next().unwrap_or(""))
            .flat_map(str::split_whitespace)
            .collect::<Vec<_>>();

        let [rows, cols] = match tokens.get(..2) {
            Some(&[rows, cols]) => [rows, cols],
            _ => return Err(cost_error("missing `rows columns` header")),
        };
        let rows = rows.parse::<usize>()
            .map_err(|_| cost_error(format!("`{rows}` is not a row count")))?;
        let cols = cols.parse::<usize>()
            .map_err(|_| cost_error(format!("`{cols}` is not a column count")))?;
        if rows != cols {
            return Err(cost_error("cost matrix is not square"));
        }
        if rows == 0 {
            return Err(cost_error("matrix is empty"));
        }

        let entries = &tokens[2..];
        if entries.len() != rows * cols {
            return Err(cost_error(format!(
                "expected {} entries, found {}", rows * cols, entries.len()
            )));
        }
        let values = entries.iter()
            .map(|token| parse_number(token))
            .collect::<Result<Vec<_>>>()?;
        Self::from_rows(values.chunks(cols).map(<[f64]>::to_vec).collect())
    }


    /// Parses a single-line literal such as `[0 1; 5 0]`.
    /// Cells are separated by whitespace or commas, rows by `;`.
    pub fn parse_matlab(text: &str) -> Result<Self> {
        let body = text.trim()
            .strip_prefix('[')
            .and_then(|s| s.strip_suffix(']'))
            .ok_or_else(|| cost_error("matrix literal must be enclosed in `[...]`"))?;
        let rows = body.split(';')
            .map(|row| {
                row.split(|c: char| c.is_whitespace() || c == ',')
                    .filter(|token| !token.is_empty())
                    .map(parse_number)
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;
        Self::from_rows(rows)
    }


    /// Parses lines of `true-class predicted-class cost` triples.
    /// Cells that are not listed keep the values of
    /// [`CostMatrix::new`]`(num_classes)`.
    pub fn parse_old_format(text: &str, num_classes: usize) -> Result<Self> {
        let mut matrix = Self::new(num_classes);
        for line in text.lines() {
            let line = line.split('%').next().unwrap_or("");
            let tokens = line.split_whitespace().collect::<Vec<_>>();
            match tokens[..] {
                [] => continue,
                [i, j, cost] => {
                    let i = matrix.parse_class(i)?;
                    let j = matrix.parse_class(j)?;
                    matrix.cells[i][j] = parse_number(cost)?;
                },
                _ => return Err(cost_error(format!(
                    "expected `true predicted cost`, found `{}`", line.trim()
                ))),
            }
        }
        Ok(matrix)
    }


    fn parse_class(&self, token: &str) -> Result<usize> {
        let value = parse_number(token)?;
        if value < 0f64 || value.fract() != 0f64 || value as usize >= self.size() {
            return Err(cost_error(format!(
                "`{token}` is not a class index below {}", self.size()
            )));
        }
        Ok(value as usize)
    }


    /// Reads a matrix in the format of [`CostMatrix::parse`].
    /// A file whose content starts with `[` is read
    /// by [`CostMatrix::parse_matlab`] instead.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        if text.trim_start().starts_with('[') {
            Self::parse_matlab(&text)
        } else {
            Self::parse(&text)
        }
    }


    /// Number of classes.
    pub fn size(&self) -> usize {
        self.cells.len()
    }


    /// Cost of predicting `predicted` for an instance of class `actual`.
    pub fn get(&self, actual: usize, predicted: usize) -> f64 {
        self.cells[actual][predicted]
    }


    /// Set the cost of predicting `predicted`
    /// for an instance of class `actual`.
    pub fn set(&mut self, actual: usize, predicted: usize, cost: f64) {
        self.cells[actual][predicted] = cost;
    }


    /// Writes the matrix as a single-line literal.
    pub fn to_matlab(&self) -> String {
        let rows = self.cells.iter()
            .map(|row| {
                row.iter()
                    .map(|c| c.to_string())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect::<Vec<_>>();
        format!("[{}]", rows.join("; "))
    }


    /// Subtracts the diagonal entry of each column from the column,
    /// so that correct predictions cost nothing.
    pub fn normalize(&mut self) {
        for j in 0..self.size() {
            let diag = self.cells[j][j];
            self.cells.iter_mut()
                .for_each(|row| { row[j] -= diag; });
        }
    }


    /// Expected cost of predicting each class
    /// when the true class is distributed as `dist`.
    pub fn expected_costs(&self, dist: &[f64]) -> Result<Vec<f64>> {
        if dist.len() != self.size() {
            return Err(cost_error(format!(
                "length of distribution ({}) does not match size of cost matrix ({})",
                dist.len(), self.size(),
            )));
        }
        let costs = (0..self.size())
            .map(|j| {
                dist.iter()
                    .zip(&self.cells)
                    .map(|(p, row)| p * row[j])
                    .sum::<f64>()
            })
            .collect();
        Ok(costs)
    }


    /// Checks that `self` matches the class of `data`.
    pub fn check_size(&self, data: &Dataset) -> Result<()> {
        if self.size() != data.num_classes() {
            return Err(cost_error(format!(
                "cost matrix has {} classes but the data has {}",
                self.size(), data.num_classes(),
            )));
        }
        Ok(())
    }


    /// Reweights `data` so that each instance of class `i`
    /// weighs proportionally to the total cost of misclassifying class `i`.
    /// The total weight of `data` is preserved.
    ///
    /// If `rng` is given, the reweighted data is resampled
    /// into an unweighted dataset of the same size instead.
    pub fn apply<R: Rng + ?Sized>(&self, data: &Dataset, rng: Option<&mut R>)
        -> Result<Dataset>
    {
        self.check_size(data)?;
        if self.cells.iter().flatten().any(|c| *c < 0f64) {
            return Err(cost_error("negative costs are not allowed"));
        }

        let class_weights = data.class_counts();
        let sum_of_weights = data.sum_of_weights();

        let misclass = self.cells.iter()
            .map(|row| row.iter().sum::<f64>())
            .collect::<Vec<_>>();
        let total = misclass.iter()
            .zip(&class_weights)
            .map(|(m, w)| m * w)
            .sum::<f64>();
        if total <= 0f64 {
            return Err(cost_error(
                "every class present in the data has zero misclassification cost"
            ));
        }
        let factors = misclass.iter()
            .map(|m| m * sum_of_weights / total)
            .collect::<Vec<_>>();
        debug!("cost matrix weight factors: {factors:?}");

        let weights = data.iter()
            .map(|instance| {
                let y = instance.class_value() as usize;
                instance.weight() * factors.get(y).copied().unwrap_or(0f64)
            })
            .collect::<Vec<_>>();

        match rng {
            Some(rng) => data.resample_with_weights(rng, &weights),
            None => data.with_weights(&weights),
        }
    }
}


impl TryFrom<Vec<Vec<f64>>> for CostMatrix {
    type Error = EnsembleError;
    fn try_from(rows: Vec<Vec<f64>>) -> Result<Self> {
        Self::from_rows(rows)
    }
}


impl From<CostMatrix> for Vec<Vec<f64>> {
    fn from(matrix: CostMatrix) -> Self {
        matrix.cells
    }
}


impl fmt::Display for CostMatrix {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "% Rows\tColumns")?;
        writeln!(f, "{}\t{}", self.size(), self.size())?;
        writeln!(f, "% Matrix elements")?;
        for row in self.cells.iter() {
            let row = row.iter()
                .map(|c| c.to_string())
                .collect::<Vec<_>>()
                .join("\t");
            writeln!(f, "{row}")?;
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Attribute, Instance, Schema};
    use approx::assert_abs_diff_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn two_classes() -> CostMatrix {
        CostMatrix::from_rows(vec![vec![0.0, 1.0], vec![5.0, 0.0]]).unwrap()
    }

    #[test]
    fn expected_costs_weigh_rows_by_probability() {
        let costs = two_classes().expected_costs(&[0.5, 0.5]).unwrap();
        assert_eq!(costs, vec![2.5, 0.5]);
        assert!(two_classes().expected_costs(&[1.0]).is_err());
    }

    #[test]
    fn three_formats_agree() {
        let text = "% costs\n2 2\n% elements\n0 1\n5 0 % tail\n";
        assert_eq!(CostMatrix::parse(text).unwrap(), two_classes());
        assert_eq!(CostMatrix::parse_matlab("[0 1; 5 0]").unwrap(), two_classes());
        assert_eq!(CostMatrix::parse_matlab(" [0, 1;5,0] ").unwrap(), two_classes());
        assert_eq!(CostMatrix::parse_old_format("1 0 5\n", 2).unwrap(), two_classes());
        assert_eq!(CostMatrix::parse(&two_classes().to_string()).unwrap(), two_classes());
        assert_eq!(
            CostMatrix::parse_matlab(&two_classes().to_matlab()).unwrap(),
            two_classes(),
        );
    }

    #[test]
    fn malformed_text_is_rejected() {
        assert!(CostMatrix::parse("2 3\n0 1 2\n3 4 5\n").is_err());
        assert!(CostMatrix::parse("2 2\n0 1\n5\n").is_err());
        assert!(CostMatrix::parse_matlab("[0 1; 5]").is_err());
        assert!(CostMatrix::parse_matlab("0 1; 5 0").is_err());
        assert!(CostMatrix::parse_old_format("2 0 1\n", 2).is_err());
        assert!(CostMatrix::parse_old_format("0 1\n", 2).is_err());
    }

    #[test]
    fn normalize_zeroes_the_diagonal() {
        let mut matrix = CostMatrix::from_rows(
            vec![vec![1.0, 2.0], vec![4.0, 3.0]]
        ).unwrap();
        matrix.normalize();
        assert_eq!(matrix, CostMatrix::from_rows(
            vec![vec![0.0, -1.0], vec![3.0, 0.0]]
        ).unwrap());
    }

    fn data() -> Dataset {
        let schema = Schema::new(
            "toy",
            vec![Attribute::numeric("x")],
            Attribute::nominal("y", ["a", "b"]),
        ).unwrap();
        let instances = [0.0, 0.0, 0.0, 1.0]
            .into_iter()
            .enumerate()
            .map(|(i, y)| Instance::new(vec![i as f64], y))
            .collect();
        Dataset::from_instances(schema, instances).unwrap()
    }

    #[test]
    fn apply_reweights_by_class_cost() {
        let data = data();
        let reweighted = two_classes()
            .apply::<ChaCha8Rng>(&data, None)
            .unwrap();
        // total = 1 * 3 + 5 * 1 = 8, factors = [4 / 8, 20 / 8]
        assert_abs_diff_eq!(reweighted[0].weight(), 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(reweighted[3].weight(), 2.5, epsilon = 1e-12);
        assert_abs_diff_eq!(reweighted.sum_of_weights(), 4.0, epsilon = 1e-12);

        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let resampled = two_classes().apply(&data, Some(&mut rng)).unwrap();
        assert_eq!(resampled.len(), data.len());
        assert!(resampled.iter().all(|instance| instance.weight() == 1.0));
    }

    #[test]
    fn apply_rejects_zero_costs() {
        let zeros = CostMatrix::from_rows(vec![vec![0.0; 2]; 2]).unwrap();
        assert!(zeros.apply::<ChaCha8Rng>(&data(), None).is_err());
    }
}
