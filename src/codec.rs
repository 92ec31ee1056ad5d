//! Saving and loading collections of signatures as JSON.
//!
//! A document is a JSON array with one flat record per signature. Loading
//! also accepts a single record, the older nested layout where a record
//! holds several sketches under `signatures`, and gzip-compressed input.

use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::selection::Selection;
use crate::signature::Signature;
use crate::sketch::minhash::KmerMinHash;
use crate::Error;
use crate::Result;

/// How [`save_signatures`] formats its output.
#[derive(Debug, Clone, TypedBuilder)]
pub struct SaveOptions {
    /// Indented JSON instead of a single line.
    #[builder(default)]
    pretty: bool,

    /// gzip level, 1 to 9. `None` or `0` writes plain JSON.
    #[builder(default, setter(strip_option))]
    compression: Option<u32>,
}

impl Default for SaveOptions {
    fn default() -> SaveOptions {
        SaveOptions::builder().build()
    }
}

impl SaveOptions {
    pub fn pretty(&self) -> bool {
        self.pretty
    }

    pub fn compression(&self) -> Option<u32> {
        self.compression
    }

    fn level(&self) -> Option<niffler::compression::Level> {
        let level = match self.compression? {
            0 => return None,
            1 => niffler::compression::Level::One,
            2 => niffler::compression::Level::Two,
            3 => niffler::compression::Level::Three,
            4 => niffler::compression::Level::Four,
            5 => niffler::compression::Level::Five,
            6 => niffler::compression::Level::Six,
            7 => niffler::compression::Level::Seven,
            8 => niffler::compression::Level::Eight,
            _ => niffler::compression::Level::Nine,
        };
        Some(level)
    }
}

#[derive(Serialize)]
struct SigRecordRef<'a> {
    #[serde(flatten)]
    minhash: &'a KmerMinHash,

    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,

    #[serde(skip_serializing_if = "Option::is_none")]
    filename: Option<&'a str>,
}

impl<'a> From<&'a Signature> for SigRecordRef<'a> {
    fn from(sig: &'a Signature) -> SigRecordRef<'a> {
        SigRecordRef {
            minhash: sig.minhash(),
            name: sig.name(),
            filename: sig.filename(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SigRecord {
    Flat {
        #[serde(flatten)]
        minhash: KmerMinHash,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        filename: Option<String>,
    },
    Nested {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        filename: Option<String>,
        signatures: Vec<KmerMinHash>,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SigDocument {
    Many(Vec<SigRecord>),
    One(SigRecord),
}

fn into_signature(
    minhash: KmerMinHash,
    name: Option<String>,
    filename: Option<String>,
) -> Signature {
    let mut sig = Signature::new(minhash);
    if let Some(name) = name {
        sig.set_name(&name);
    }
    if let Some(filename) = filename {
        sig.set_filename(&filename);
    }
    sig
}

impl SigRecord {
    fn into_signatures(self) -> Vec<Signature> {
        match self {
            SigRecord::Flat {
                minhash,
                name,
                filename,
            } => vec![into_signature(minhash, name, filename)],
            SigRecord::Nested {
                name,
                filename,
                signatures,
            } => signatures
                .into_iter()
                .map(|mh| into_signature(mh, name.clone(), filename.clone()))
                .collect(),
        }
    }
}

/// Write `sigs` as one JSON document.
pub fn save_signatures<W: Write>(
    sigs: &[Signature],
    mut writer: W,
    options: &SaveOptions,
) -> Result<()> {
    let records: Vec<SigRecordRef> = sigs.iter().map(SigRecordRef::from).collect();

    let json = if options.pretty {
        serde_json::to_vec_pretty(&records)?
    } else {
        serde_json::to_vec(&records)?
    };

    match options.level() {
        Some(level) => {
            let mut buffer = vec![];
            {
                let mut gz = niffler::get_writer(
                    Box::new(&mut buffer),
                    niffler::compression::Format::Gzip,
                    level,
                )?;
                gz.write_all(&json)?;
            }
            writer.write_all(&buffer)?;
        }
        None => writer.write_all(&json)?,
    }

    debug!("saved {} signatures", sigs.len());
    Ok(())
}

pub fn save_signatures_to_vec(sigs: &[Signature], options: &SaveOptions) -> Result<Vec<u8>> {
    let mut buffer = vec![];
    save_signatures(sigs, &mut buffer, options)?;
    Ok(buffer)
}

pub fn save_signatures_to_path<P: AsRef<Path>>(
    sigs: &[Signature],
    path: P,
    options: &SaveOptions,
) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    save_signatures(sigs, &mut writer, options)?;
    writer.flush()?;
    Ok(())
}

/// Where [`load_signatures`] reads from.
pub enum SigSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
    Reader(Box<dyn Read>),
}

impl SigSource {
    fn into_reader(self) -> Result<Box<dyn Read>> {
        Ok(match self {
            SigSource::Path(path) => Box::new(File::open(path)?),
            SigSource::Bytes(data) => Box::new(io::Cursor::new(data)),
            SigSource::Reader(rdr) => rdr,
        })
    }

    fn read_signatures(self) -> Result<Vec<Signature>> {
        let mut raw = vec![];
        self.into_reader()?.read_to_end(&mut raw)?;

        // niffler needs a few bytes to sniff the format; anything shorter
        // can't be compressed anyway.
        let data = if raw.len() < 5 {
            raw
        } else {
            let (mut rdr, format) = niffler::get_reader(Box::new(io::Cursor::new(raw)))?;
            debug!("reading signatures, compression: {:?}", format);
            let mut data = vec![];
            rdr.read_to_end(&mut data)?;
            data
        };

        let records = match serde_json::from_slice(&data)? {
            SigDocument::Many(records) => records,
            SigDocument::One(record) => vec![record],
        };

        Ok(records
            .into_iter()
            .flat_map(SigRecord::into_signatures)
            .collect())
    }
}

impl std::fmt::Debug for SigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SigSource::Path(path) => f.debug_tuple("Path").field(path).finish(),
            SigSource::Bytes(data) => write!(f, "Bytes({} bytes)", data.len()),
            SigSource::Reader(_) => f.write_str("Reader"),
        }
    }
}

impl From<&Path> for SigSource {
    fn from(path: &Path) -> SigSource {
        SigSource::Path(path.into())
    }
}

impl From<PathBuf> for SigSource {
    fn from(path: PathBuf) -> SigSource {
        SigSource::Path(path)
    }
}

impl From<Vec<u8>> for SigSource {
    fn from(data: Vec<u8>) -> SigSource {
        SigSource::Bytes(data)
    }
}

impl From<&[u8]> for SigSource {
    fn from(data: &[u8]) -> SigSource {
        SigSource::Bytes(data.to_vec())
    }
}

impl From<Box<dyn Read>> for SigSource {
    fn from(rdr: Box<dyn Read>) -> SigSource {
        SigSource::Reader(rdr)
    }
}

/// Lazy iterator over the signatures of a [`SigSource`].
///
/// The source is opened and parsed on the first call to `next`.
pub struct LoadSignatures {
    source: Option<SigSource>,
    selection: Selection,
    do_raise: bool,
    loaded: std::vec::IntoIter<Signature>,
}

impl Iterator for LoadSignatures {
    type Item = Result<Signature>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(source) = self.source.take() {
            debug!("loading signatures from {:?}", source);
            match source.read_signatures() {
                Ok(sigs) => self.loaded = sigs.into_iter(),
                Err(e) if self.do_raise => return Some(Err(e)),
                Err(e) => {
                    warn!("error while loading signatures: {}", e);
                    return None;
                }
            }
        }

        let selection = &self.selection;
        self.loaded.find(|sig| selection.matches(sig)).map(Ok)
    }
}

/// Signatures from `source` matching `selection`.
///
/// With `do_raise`, a source that can't be read or parsed yields a single
/// error; otherwise the failure is logged and nothing is yielded.
pub fn load_signatures<S: Into<SigSource>>(
    source: S,
    selection: &Selection,
    do_raise: bool,
) -> LoadSignatures {
    LoadSignatures {
        source: Some(source.into()),
        selection: selection.clone(),
        do_raise,
        loaded: vec![].into_iter(),
    }
}

/// The only signature in `source` matching `selection`.
pub fn load_one_signature<S: Into<SigSource>>(source: S, selection: &Selection) -> Result<Signature> {
    let mut sigs = load_signatures(source, selection, true).collect::<Result<Vec<_>>>()?;
    match sigs.len() {
        1 => sigs.pop().ok_or(Error::ExpectedOneSignature { found: 0 }),
        found => Err(Error::ExpectedOneSignature { found }),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::encodings::HashFunctions;
    use crate::signature::SigsTrait;

    const NESTED: &str = r#"[{"class":"sourmash_signature","email":"","filename":"-",
        "hash_function":"0.murmur64","license":"CC0","name":"genome",
        "signatures":[
          {"num":0,"ksize":31,"seed":42,"max_hash":18446744073709552,
           "mins":[10,3,5],"md5sum":"not-the-md5","molecule":"DNA"},
          {"num":3,"ksize":21,"seed":42,"max_hash":0,
           "mins":[1,2,3],"abundances":[3,2,1],"molecule":"protein"}],
        "version":0.4}]"#;

    fn sig_with(hashes: &[u64], name: &str) -> Signature {
        let mut mh = KmerMinHash::new(0, 21, HashFunctions::murmur64_DNA, 42, false, 10).unwrap();
        mh.add_many(hashes).unwrap();
        Signature::builder().sketch(mh).name(name).build()
    }

    #[test]
    fn nested_layout() {
        let sigs: Vec<Signature> = load_signatures(NESTED.as_bytes(), &Selection::default(), true)
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(sigs.len(), 2);
        assert_eq!(sigs[0].name(), Some("genome"));
        assert_eq!(sigs[0].filename(), Some("-"));
        assert_eq!(sigs[0].minhash().scaled(), 1000);
        assert_eq!(sigs[0].minhash().mins(), vec![3, 5, 10]);

        let prot = sigs[1].minhash();
        assert_eq!(prot.hash_function(), HashFunctions::murmur64_protein);
        assert_eq!(prot.num(), 3);
        assert_eq!(prot.to_vec_abunds(), vec![(1, 3), (2, 2), (3, 1)]);
    }

    #[test]
    fn single_record_document() {
        let data = save_signatures_to_vec(&[sig_with(&[1, 2], "one")], &SaveOptions::default())
            .unwrap();
        // strip the array brackets
        let single = &data[1..data.len() - 1];

        let sig = load_one_signature(single, &Selection::default()).unwrap();
        assert_eq!(sig, sig_with(&[1, 2], "one"));
    }

    #[test]
    fn minified_and_pretty() {
        let sigs = [sig_with(&[1, 2], "one")];

        let compact = save_signatures_to_vec(&sigs, &SaveOptions::default()).unwrap();
        assert!(!compact.contains(&b'\n'));

        let pretty =
            save_signatures_to_vec(&sigs, &SaveOptions::builder().pretty(true).build()).unwrap();
        assert!(pretty.contains(&b'\n'));

        let text = String::from_utf8(compact).unwrap();
        assert!(text.contains("\"name\":\"one\""));
        assert!(!text.contains("filename"));
        assert!(!text.contains("abundances"));
    }

    #[test]
    fn empty_name_survives_roundtrip() {
        let mut sig = sig_with(&[1, 2], "");
        sig.set_filename("");

        let data = save_signatures_to_vec(&[sig.clone()], &SaveOptions::default()).unwrap();
        let text = String::from_utf8(data.clone()).unwrap();
        assert!(text.contains("\"name\":\"\""));
        assert!(text.contains("\"filename\":\"\""));

        let loaded = load_one_signature(data, &Selection::default()).unwrap();
        assert_eq!(loaded.name(), Some(""));
        assert_eq!(loaded.filename(), Some(""));
        assert_eq!(loaded, sig);
    }

    #[test]
    fn gzip_is_detected() {
        let sigs = vec![sig_with(&[1, 2], "one"), sig_with(&[3], "two")];
        let options = SaveOptions::builder().compression(6).build();
        let data = save_signatures_to_vec(&sigs, &options).unwrap();

        // gzip magic
        assert_eq!(&data[..2], &[0x1f, 0x8b]);

        let loaded: Vec<Signature> = load_signatures(data, &Selection::default(), true)
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(loaded, sigs);
    }

    #[test]
    fn lazy_until_next() {
        let missing = PathBuf::from("/nonexistent/path/to.sig");

        let mut iter = load_signatures(missing.clone(), &Selection::default(), true);
        assert!(matches!(iter.next(), Some(Err(Error::IOError(_)))));
        assert!(iter.next().is_none());

        let mut quiet = load_signatures(missing, &Selection::default(), false);
        assert!(quiet.next().is_none());
    }

    #[test]
    fn garbage_is_an_error() {
        let mut iter = load_signatures(&b"this is not json"[..], &Selection::default(), true);
        assert!(matches!(iter.next(), Some(Err(_))));
    }

    #[test]
    fn expected_one() {
        let sigs = vec![sig_with(&[1, 2], "one"), sig_with(&[3], "two")];
        let data = save_signatures_to_vec(&sigs, &SaveOptions::default()).unwrap();

        assert!(matches!(
            load_one_signature(data.clone(), &Selection::default()),
            Err(Error::ExpectedOneSignature { found: 2 })
        ));

        let empty = save_signatures_to_vec(&[], &SaveOptions::default()).unwrap();
        assert!(matches!(
            load_one_signature(empty, &Selection::default()),
            Err(Error::ExpectedOneSignature { found: 0 })
        ));
    }
}
