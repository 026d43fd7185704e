//! Arity specs for host methods.

use mrb_runtime::Aspec;

/// Number of arguments a host method accepts; checked by the engine
/// before the host function runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Args(Aspec);

impl Args {
    pub fn any() -> Self {
        Args(Aspec::Any)
    }

    pub fn none() -> Self {
        Args(Aspec::None)
    }

    pub fn required(n: u32) -> Self {
        Args(Aspec::Req(n))
    }

    pub fn optional(n: u32) -> Self {
        Args(Aspec::Opt(n))
    }

    pub fn arg(required: u32, optional: u32) -> Self {
        Args(Aspec::Arg {
            req: required,
            opt: optional,
        })
    }

    pub(crate) fn aspec(self) -> Aspec {
        self.0
    }
}

impl Default for Args {
    fn default() -> Self {
        Args::any()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn specs_check_counts() {
        assert!(Args::any().aspec().check(7).is_ok());
        assert!(Args::none().aspec().check(1).is_err());
        assert!(Args::required(2).aspec().check(2).is_ok());
        assert!(Args::optional(2).aspec().check(0).is_ok());
        assert_eq!(
            Args::arg(1, 1).aspec().check(3),
            Err("wrong number of arguments (given 3, expected 1..2)".to_string())
        );
    }
}
