use std::collections::HashSet;

use sourmash_sig::cmd::ComputeParameters;
use sourmash_sig::codec::{load_one_signature, load_signatures, save_signatures_to_vec, SaveOptions};
use sourmash_sig::encodings::HashFunctions;
use sourmash_sig::prelude::*;
use sourmash_sig::Error;

fn sig_with(ksize: u32, num: u32, hashes: &[u64]) -> Signature {
    let mut mh = KmerMinHash::new(0, ksize, HashFunctions::murmur64_DNA, 42, false, num).unwrap();
    mh.add_many(hashes).unwrap();
    Signature::new(mh)
}

fn scaled_sig(hashes: &[u64]) -> Signature {
    let mut mh = KmerMinHash::new(1, 21, HashFunctions::murmur64_DNA, 42, false, 0).unwrap();
    mh.add_many(hashes).unwrap();
    Signature::new(mh)
}

fn roundtrip(sig: &Signature) -> Signature {
    let buf = save_signatures_to_vec(std::slice::from_ref(sig), &SaveOptions::default()).unwrap();
    load_one_signature(buf, &Selection::default()).unwrap()
}

#[test]
fn md5_of_known_sketch() {
    let sig = sig_with(20, 1, &[5]);
    assert_eq!(sig.md5sum(), "eae27d77ca20db309e056e3d2dcd7d69");
}

#[test]
fn display_prefers_name_then_filename() {
    let mut sig = sig_with(20, 1, &[5]);
    assert_eq!(sig.to_string(), "eae27d77");

    sig.set_filename("foo.txt");
    assert_eq!(sig.to_string(), "foo.txt");

    sig.set_name("foo");
    assert_eq!(sig.to_string(), "foo");
    assert_eq!(format!("{:?}", sig), "Signature(\"foo\", eae27d77)");
}

#[test]
fn builder_sets_name_and_filename() {
    let mh = KmerMinHash::new(0, 20, HashFunctions::murmur64_DNA, 42, false, 1).unwrap();
    let sig = Signature::builder()
        .sketch(mh)
        .name("foo")
        .filename("foo.txt")
        .build();

    assert_eq!(sig.name(), Some("foo"));
    assert_eq!(sig.filename(), Some("foo.txt"));
}

#[test]
fn copy_is_frozen_and_equal() {
    let mut sig = sig_with(20, 1, &[5]);
    sig.set_name("foo");

    let mut copied = sig.copy();
    assert_eq!(sig, copied);
    assert!(copied.sketch().is_frozen());
    assert!(matches!(
        copied.sketch_mut().add_hash(1),
        Err(Error::FrozenMinHash)
    ));
}

#[test]
fn copy_and_clone_with_abundance() {
    let kmer = b"AT".repeat(10);

    for track_abundance in [false, true] {
        let mut e =
            KmerMinHash::new(0, 20, HashFunctions::murmur64_DNA, 42, track_abundance, 1).unwrap();
        e.add_kmer(&kmer).unwrap();
        assert_eq!(e.size(), 1);
        assert_eq!(e.clone(), e);

        let sig = Signature::new(e);
        let copied = sig.copy();
        assert_eq!(copied, sig);
        assert!(copied.sketch().is_frozen());
        assert_eq!(copied.minhash().abunds(), sig.minhash().abunds());
    }
}

#[test]
fn equality_needs_matching_name_and_filename() {
    let mut a = sig_with(20, 1, &[5]);
    let mut b = sig_with(20, 1, &[5]);
    assert_eq!(a, b);

    a.set_name("foo");
    assert_ne!(a, b);
    b.set_name("bar");
    assert_ne!(a, b);
    b.set_name("foo");
    assert_eq!(a, b);

    a.set_filename("a.txt");
    assert_ne!(a, b);
    b.set_filename("b.txt");
    assert_ne!(a, b);
}

#[test]
fn signatures_are_hashable() {
    let a = sig_with(20, 1, &[5]);
    let b = sig_with(20, 1, &[5]);
    let c = sig_with(20, 1, &[6]);

    let set: HashSet<Signature> = vec![a, b, c].into_iter().collect();
    assert_eq!(set.len(), 2);
}

#[test]
fn roundtrip_keeps_sketch_and_name() {
    let mut sig = sig_with(20, 1, &[5]);
    sig.set_name("foo");

    let loaded = roundtrip(&sig);
    assert_eq!(loaded, sig);
    assert_eq!(loaded.name(), Some("foo"));
    assert!((loaded.similarity(&sig, false).unwrap() - 1.0).abs() < 1e-9);
}

#[test]
fn roundtrip_empty() {
    let sig = sig_with(20, 1, &[]);
    let loaded = roundtrip(&sig);

    assert_eq!(loaded.similarity(&sig, false).unwrap(), 0.0);
    assert_eq!(loaded, sig);
}

#[test]
fn roundtrip_max_hash_and_seed() {
    let mut mh = KmerMinHash::with_max_hash(10, 20, HashFunctions::murmur64_DNA, 42, false);
    mh.add_many(&[5, 20]).unwrap();
    let sig = Signature::new(mh);

    let loaded = roundtrip(&sig);
    assert_eq!(loaded.minhash().max_hash(), 10);
    assert_eq!(loaded.minhash().scaled(), sig.minhash().scaled());
    assert_eq!(loaded.minhash().mins(), vec![5]);

    let mut mh = KmerMinHash::new(0, 20, HashFunctions::murmur64_DNA, 10, false, 1).unwrap();
    mh.add_hash(5);
    let loaded = roundtrip(&Signature::new(mh));
    assert_eq!(loaded.minhash().seed(), 10);
}

#[test]
fn load_with_string_ksize() {
    let sig = sig_with(20, 1, &[5]);
    let buf = save_signatures_to_vec(&[sig.clone()], &SaveOptions::default()).unwrap();

    let selection = Selection::from_ksize("20").unwrap();
    assert_eq!(load_one_signature(buf.clone(), &selection).unwrap(), sig);

    let selection = Selection::from_ksize("21").unwrap();
    assert_eq!(load_signatures(buf, &selection, true).count(), 0);
}

#[test]
fn similarity_downsample() {
    let mut e = KmerMinHash::with_max_hash(1 << 63, 20, HashFunctions::murmur64_DNA, 42, false);
    e.add_many(&[1, 5]).unwrap();
    let mut f = KmerMinHash::with_max_hash(4, 20, HashFunctions::murmur64_DNA, 42, false);
    f.add_many(&[1, 5]).unwrap();

    let ss_e = Signature::new(e);
    let ss_f = Signature::new(f);

    let err = ss_e.similarity(&ss_f, false).unwrap_err();
    assert_eq!(err.to_string(), "mismatch in scaled; comparison fail");

    assert!((ss_e.similarity(&ss_f, true).unwrap() - 1.0).abs() < 1e-9);
}

#[test]
fn add_sequence_bad_dna() {
    let mut sig = Signature::new(
        KmerMinHash::new(0, 21, HashFunctions::murmur64_DNA, 42, false, 1).unwrap(),
    );

    let err = sig.add_sequence(&[b'N'; 21], false).unwrap_err();
    assert_eq!(
        err.to_string(),
        "invalid DNA character in input k-mer: NNNNNNNNNNNNNNNNNNNNN"
    );
    assert!(sig.add_sequence(&[b'N'; 21], true).is_ok());
}

#[test]
fn max_containment() {
    let ss1 = scaled_sig(&[1, 2, 3, 4]);
    let ss2 = scaled_sig(&[1, 5]);

    assert!((ss1.contained_by(&ss2, false).unwrap() - 1.0 / 4.0).abs() < 1e-9);
    assert!((ss2.contained_by(&ss1, false).unwrap() - 1.0 / 2.0).abs() < 1e-9);
    assert!((ss1.max_containment(&ss2, false).unwrap() - 1.0 / 2.0).abs() < 1e-9);
    assert!((ss2.max_containment(&ss1, false).unwrap() - 1.0 / 2.0).abs() < 1e-9);
}

#[test]
fn max_containment_empty() {
    let ss1 = scaled_sig(&[]);
    let ss2 = scaled_sig(&[1, 5]);

    assert_eq!(ss1.contained_by(&ss2, false).unwrap(), 0.0);
    assert_eq!(ss2.contained_by(&ss1, false).unwrap(), 0.0);
    assert_eq!(ss1.max_containment(&ss2, false).unwrap(), 0.0);
    assert_eq!(ss2.max_containment(&ss1, false).unwrap(), 0.0);
}

#[test]
fn max_containment_equal() {
    let ss1 = scaled_sig(&[1, 2, 3, 4]);
    let ss2 = scaled_sig(&[1, 2, 3, 4]);

    assert_eq!(ss1.contained_by(&ss2, false).unwrap(), 1.0);
    assert_eq!(ss2.contained_by(&ss1, false).unwrap(), 1.0);
    assert_eq!(ss1.max_containment(&ss2, false).unwrap(), 1.0);
    assert_eq!(ss2.max_containment(&ss1, false).unwrap(), 1.0);
}

#[test]
fn from_params_builds_empty_sketches() {
    let params = ComputeParameters::builder()
        .ksizes(vec![21, 31])
        .protein(true)
        .scaled(1000u64)
        .track_abundance(true)
        .build();

    let sigs = Signature::from_params(&params).unwrap();
    assert_eq!(sigs.len(), 4);
    for sig in &sigs {
        assert!(sig.minhash().is_empty());
        assert_eq!(sig.minhash().scaled(), 1000);
        assert!(sig.minhash().track_abundance());
    }
    assert_eq!(sigs[2].minhash().hash_function(), HashFunctions::murmur64_protein);
}

#[test]
fn to_writer_writes_a_loadable_document() {
    let mut sig = sig_with(20, 1, &[5]);
    sig.set_name("foo");

    let mut buf = vec![];
    sig.to_writer(&mut buf).unwrap();

    let loaded = load_one_signature(buf, &Selection::default()).unwrap();
    assert_eq!(loaded, sig);
}
