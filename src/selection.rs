use std::convert::TryFrom;

use typed_builder::TypedBuilder;

use crate::encodings::HashFunctions;
use crate::signature::{Signature, SigsTrait};
use crate::Error;
use crate::Result;

/// Filters applied while loading signatures. Unset fields match anything.
#[derive(Default, Debug, TypedBuilder, Clone, PartialEq, Eq)]
pub struct Selection {
    #[builder(default, setter(strip_option))]
    ksize: Option<u32>,

    #[builder(default, setter(strip_option))]
    abund: Option<bool>,

    #[builder(default, setter(strip_option))]
    num: Option<u32>,

    #[builder(default, setter(strip_option))]
    scaled: Option<u64>,

    #[builder(default, setter(strip_option))]
    moltype: Option<HashFunctions>,
}

/// Conversion for ksize arguments, which may come in as numbers or as
/// strings read from a command line or a config file.
pub trait IntoKsize {
    fn into_ksize(self) -> Result<u32>;
}

fn check_ksize(ksize: u32) -> Result<u32> {
    if ksize == 0 {
        Err(Error::InvalidKsize {
            message: "ksize must be positive".into(),
        })
    } else {
        Ok(ksize)
    }
}

impl IntoKsize for u32 {
    fn into_ksize(self) -> Result<u32> {
        check_ksize(self)
    }
}

impl IntoKsize for usize {
    fn into_ksize(self) -> Result<u32> {
        let ksize = u32::try_from(self).map_err(|_| Error::InvalidKsize {
            message: format!("{} is too large", self),
        })?;
        check_ksize(ksize)
    }
}

impl IntoKsize for &str {
    fn into_ksize(self) -> Result<u32> {
        let ksize: u32 = self.trim().parse()?;
        check_ksize(ksize)
    }
}

impl IntoKsize for String {
    fn into_ksize(self) -> Result<u32> {
        self.as_str().into_ksize()
    }
}

impl Selection {
    pub fn from_ksize<K: IntoKsize>(ksize: K) -> Result<Selection> {
        Ok(Selection {
            ksize: Some(ksize.into_ksize()?),
            ..Default::default()
        })
    }

    pub fn ksize(&self) -> Option<u32> {
        self.ksize
    }

    pub fn set_ksize<K: IntoKsize>(&mut self, ksize: K) -> Result<()> {
        self.ksize = Some(ksize.into_ksize()?);
        Ok(())
    }

    pub fn abund(&self) -> Option<bool> {
        self.abund
    }

    pub fn set_abund(&mut self, value: bool) {
        self.abund = Some(value);
    }

    pub fn num(&self) -> Option<u32> {
        self.num
    }

    pub fn set_num(&mut self, num: u32) {
        self.num = Some(num);
    }

    pub fn scaled(&self) -> Option<u64> {
        self.scaled
    }

    pub fn set_scaled(&mut self, scaled: u64) {
        self.scaled = Some(scaled);
    }

    pub fn moltype(&self) -> Option<HashFunctions> {
        self.moltype
    }

    pub fn set_moltype(&mut self, value: HashFunctions) {
        self.moltype = Some(value);
    }

    pub fn matches(&self, sig: &Signature) -> bool {
        let mh = sig.minhash();

        self.ksize.map_or(true, |k| mh.ksize() == k as usize)
            && self.moltype.map_or(true, |m| mh.hash_function() == m)
            && self.abund.map_or(true, |a| mh.track_abundance() == a)
            && self.num.map_or(true, |n| mh.num() == n)
            && self.scaled.map_or(true, |s| mh.scaled() == s)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn ksize_from_strings() {
        assert_eq!("21".into_ksize().unwrap(), 21);
        assert_eq!(String::from(" 31 ").into_ksize().unwrap(), 31);
        assert_eq!(51usize.into_ksize().unwrap(), 51);

        assert!(matches!(
            "twenty".into_ksize(),
            Err(Error::ParseIntError(_))
        ));
        assert!(matches!("0".into_ksize(), Err(Error::InvalidKsize { .. })));
    }

    #[test]
    fn same_selection_from_int_or_str() {
        assert_eq!(
            Selection::from_ksize(20u32).unwrap(),
            Selection::from_ksize("20").unwrap()
        );
    }
}
