//! Record parsing.
//!
//! Input line format: `label,feature_1,...,feature_d`.

use crate::error::RegressionError;

/// One parsed observation: the label and its raw (non-augmented) features.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub label: f64,
    pub features: Vec<f64>,
}

impl Record {
    /// Parse already-split tokens. The first token is the label.
    ///
    /// Tokens are trimmed. Empty, non-numeric and non-finite tokens are rejected.
    pub fn parse<I, S>(tokens: I) -> Result<Self, RegressionError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut values = tokens
            .into_iter()
            .enumerate()
            .map(|(position, token)| parse_token(token.as_ref(), position));

        let label = match values.next() {
            Some(label) => label?,
            None => {
                return Err(RegressionError::Parse {
                    token: String::new(),
                    position: 0,
                });
            }
        };
        let features = values.collect::<Result<Vec<f64>, _>>()?;

        Ok(Self { label, features })
    }

    /// Split a raw comma-separated line and parse it.
    pub fn parse_line(line: &str) -> Result<Self, RegressionError> {
        Self::parse(line.trim().split(','))
    }
}

fn parse_token(token: &str, position: usize) -> Result<f64, RegressionError> {
    let trimmed = token.trim();
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(RegressionError::Parse {
            token: trimmed.to_string(),
            position,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_splits_label_from_features() {
        let r = Record::parse_line("4.5, 1.0,2,-3e-1\n").unwrap();
        assert_eq!(r.label, 4.5);
        assert_eq!(r.features, vec![1.0, 2.0, -0.3]);
    }

    #[test]
    fn parse_accepts_label_only() {
        let r = Record::parse(["7"]).unwrap();
        assert_eq!(r.label, 7.0);
        assert!(r.features.is_empty());
    }

    #[test]
    fn parse_names_the_bad_token() {
        let err = Record::parse_line("1.0,2.0,abc").unwrap_err();
        assert_eq!(
            err,
            RegressionError::Parse {
                token: "abc".to_string(),
                position: 2,
            }
        );
    }

    #[test]
    fn parse_rejects_non_finite_and_empty_tokens() {
        assert!(Record::parse_line("1.0,nan").is_err());
        assert!(Record::parse_line("inf,1.0").is_err());
        assert!(Record::parse_line("1.0,,2.0").is_err());
        assert!(Record::parse(Vec::<String>::new()).is_err());
    }
}
