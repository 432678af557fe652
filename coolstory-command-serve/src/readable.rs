/// A number with thousands separators: `2847` reads `2,847`.
pub struct Readable<N>
where
    N: std::fmt::Display,
{
    inner: N,
}

impl<N> std::fmt::Display for Readable<N>
where
    N: std::fmt::Display,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let digits = self.inner.to_string();
        let (sign, digits) = match digits.strip_prefix('-') {
            Some(rest) => ("-", rest),
            None => ("", digits.as_str()),
        };

        f.write_str(sign)?;

        for (i, c) in digits.chars().enumerate() {
            if i != 0 && (digits.len() - i) % 3 == 0 {
                f.write_str(",")?;
            }

            write!(f, "{}", c)?;
        }

        Ok(())
    }
}

pub trait IntoReadable: std::fmt::Display + Sized {
    fn into_readable(self) -> Readable<Self> {
        Readable { inner: self }
    }
}

impl<N> IntoReadable for N where N: std::fmt::Display {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separates_thousands() {
        assert_eq!(0u32.into_readable().to_string(), "0");
        assert_eq!(847u32.into_readable().to_string(), "847");
        assert_eq!(2847u32.into_readable().to_string(), "2,847");
        assert_eq!(1_234_567usize.into_readable().to_string(), "1,234,567");
        assert_eq!((-4200i64).into_readable().to_string(), "-4,200");
        assert_eq!((&3521u32).into_readable().to_string(), "3,521");
    }
}
