use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::TtlParseError;

/// Tempo de vida das entradas, fixado na construção do store.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    /// Entradas nunca expiram.
    #[default]
    None,
    /// Entradas expiram após a duração, contada a partir da criação.
    Fixed(Duration),
}

impl Ttl {
    pub fn from_millis(ms: u64) -> Self {
        Ttl::Fixed(Duration::from_millis(ms))
    }

    pub fn duration(&self) -> Option<Duration> {
        match self {
            Ttl::None => None,
            Ttl::Fixed(d) => Some(*d),
        }
    }

    pub fn is_fixed(&self) -> bool {
        matches!(self, Ttl::Fixed(_))
    }
}

impl From<Option<Duration>> for Ttl {
    fn from(d: Option<Duration>) -> Self {
        d.map(Ttl::Fixed).unwrap_or(Ttl::None)
    }
}

impl From<Duration> for Ttl {
    fn from(d: Duration) -> Self {
        Ttl::Fixed(d)
    }
}

impl fmt::Display for Ttl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ttl::None => write!(f, "none"),
            Ttl::Fixed(d) => write!(f, "{}ms", d.as_millis()),
        }
    }
}

/// Aceita `none`/`off`, ou inteiro com sufixo `ms`, `s` ou `m`.
/// Inteiro sem sufixo é interpretado como milissegundos.
impl FromStr for Ttl {
    type Err = TtlParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(TtlParseError::Empty);
        }
        if s.eq_ignore_ascii_case("none") || s.eq_ignore_ascii_case("off") {
            return Ok(Ttl::None);
        }

        let split = s
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(s.len());
        let (digits, unit) = s.split_at(split);
        if digits.is_empty() {
            return Err(TtlParseError::InvalidNumber(s.to_string()));
        }
        let n: u64 = digits
            .parse()
            .map_err(|_| TtlParseError::InvalidNumber(digits.to_string()))?;

        let duration = match unit.to_lowercase().as_str() {
            "" | "ms" => Duration::from_millis(n),
            "s" => Duration::from_secs(n),
            "m" => Duration::from_secs(
                n.checked_mul(60)
                    .ok_or_else(|| TtlParseError::InvalidNumber(digits.to_string()))?,
            ),
            other => return Err(TtlParseError::InvalidUnit(other.to_string())),
        };
        Ok(Ttl::Fixed(duration))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_none() {
        assert_eq!("none".parse::<Ttl>(), Ok(Ttl::None));
        assert_eq!("OFF".parse::<Ttl>(), Ok(Ttl::None));
    }

    #[test]
    fn parse_units() {
        assert_eq!("400ms".parse::<Ttl>(), Ok(Ttl::from_millis(400)));
        assert_eq!("400".parse::<Ttl>(), Ok(Ttl::from_millis(400)));
        assert_eq!("2s".parse::<Ttl>(), Ok(Ttl::Fixed(Duration::from_secs(2))));
        assert_eq!("5m".parse::<Ttl>(), Ok(Ttl::Fixed(Duration::from_secs(300))));
    }

    #[test]
    fn parse_boundaries() {
        assert_eq!("0".parse::<Ttl>(), Ok(Ttl::Fixed(Duration::ZERO)));
        assert_eq!("0s".parse::<Ttl>(), Ok(Ttl::Fixed(Duration::ZERO)));
        assert_eq!(
            "18446744073709551615s".parse::<Ttl>(),
            Ok(Ttl::Fixed(Duration::from_secs(u64::MAX)))
        );
        assert_eq!(
            "18446744073709551615m".parse::<Ttl>(),
            Err(TtlParseError::InvalidNumber("18446744073709551615".into()))
        );
        assert_eq!(
            "18446744073709551616".parse::<Ttl>(),
            Err(TtlParseError::InvalidNumber("18446744073709551616".into()))
        );
    }

    #[test]
    fn parse_invalid() {
        assert_eq!("".parse::<Ttl>(), Err(TtlParseError::Empty));
        assert_eq!(
            "ms".parse::<Ttl>(),
            Err(TtlParseError::InvalidNumber("ms".into()))
        );
        assert_eq!(
            "10h".parse::<Ttl>(),
            Err(TtlParseError::InvalidUnit("h".into()))
        );
    }

    #[test]
    fn display_matches_parse() {
        let ttl = Ttl::from_millis(1500);
        assert_eq!(ttl.to_string(), "1500ms");
        assert_eq!(ttl.to_string().parse::<Ttl>(), Ok(ttl));
        assert_eq!(Ttl::None.to_string(), "none");
    }

    #[test]
    fn from_option() {
        assert_eq!(Ttl::from(None::<Duration>), Ttl::None);
        assert_eq!(
            Ttl::from(Some(Duration::from_millis(10))),
            Ttl::from_millis(10)
        );
        assert!(!Ttl::default().is_fixed());
    }
}
