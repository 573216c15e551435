use thiserror::Error;

/// Row-level import problem. Any of these rejects the whole batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowError {
    #[error("Row {row}: question/answer required")]
    MissingField { row: usize },
    #[error("Row {row}: duplicate id {id}")]
    DuplicateId { row: usize, id: String },
}

impl RowError {
    /// 1-based row number the error refers to.
    pub fn row(&self) -> usize {
        match self {
            Self::MissingField { row } | Self::DuplicateId { row, .. } => *row,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            RowError::MissingField { row: 1 }.to_string(),
            "Row 1: question/answer required"
        );
        let dup = RowError::DuplicateId {
            row: 4,
            id: "faq-1".to_string(),
        };
        assert_eq!(dup.to_string(), "Row 4: duplicate id faq-1");
        assert_eq!(dup.row(), 4);
    }
}
