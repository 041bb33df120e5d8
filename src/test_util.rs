//! Presentations and helpers shared by the tests.

use rand::Rng;

use crate::presentation::Presentation;
use crate::word_graph::{Word, WordGraph};

/// Spells out a word, reading each character as its index in `alphabet`.
fn w(word: &str, alphabet: &str) -> Word {
    word.chars()
        .map(|c| alphabet.chars().position(|a| a == c).unwrap() as u32)
        .collect()
}

pub(crate) fn free_monoid(alphabet_size: u32) -> Presentation {
    let mut p = Presentation::new(alphabet_size);
    p.set_contains_empty_word(true);
    p
}

pub(crate) fn free_semigroup(alphabet_size: u32) -> Presentation {
    Presentation::new(alphabet_size)
}

pub(crate) fn cyclic_group(order: usize) -> Presentation {
    let mut p = free_monoid(1);
    p.add_rule(&vec![0; order], &[]).unwrap();
    p
}

/// `<s, t | s^2 = t^2 = (st)^3 = 1>`.
pub(crate) fn symmetric_group_s3() -> Presentation {
    let mut p = free_monoid(2);
    p.add_rule(&w("ss", "st"), &[]).unwrap();
    p.add_rule(&w("tt", "st"), &[]).unwrap();
    p.add_rule(&w("ststst", "st"), &[]).unwrap();
    p
}

/// All 15 pairs of distinct elements of S3, written over `{s, t}`.
pub(crate) fn s3_distinct_pairs() -> Vec<(Word, Word)> {
    let elements: Vec<Word> = vec![
        vec![],
        vec![0],
        vec![1],
        vec![0, 1],
        vec![1, 0],
        vec![0, 1, 0],
    ];
    let mut pairs = Vec::new();
    for i in 0..elements.len() {
        for j in i + 1..elements.len() {
            pairs.push((elements[i].clone(), elements[j].clone()));
        }
    }
    pairs
}

/// Popova's presentation of the symmetric inverse monoid on 2 points, a
/// monoid with 7 elements.
pub(crate) fn symmetric_inverse_monoid_2() -> Presentation {
    let mut p = free_monoid(2);
    p.add_rule(&w("ss", "se"), &[]).unwrap();
    p.add_rule(&w("ee", "se"), &w("e", "se")).unwrap();
    p.add_rule(&w("eses", "se"), &w("sese", "se")).unwrap();
    p.add_rule(&w("sese", "se"), &w("ese", "se")).unwrap();
    p
}

/// The Temperley-Lieb monoid on `n` strands, presented on the `n - 1`
/// diagram generators.
pub(crate) fn temperley_lieb_monoid(n: u32) -> Presentation {
    let mut p = free_monoid(n - 1);
    for i in 0..n - 1 {
        p.add_rule(&[i, i], &[i]).unwrap();
        for j in 0..n - 1 {
            let gap = i.abs_diff(j);
            if gap == 1 {
                p.add_rule(&[i, j, i], &[i]).unwrap();
            } else if gap >= 2 {
                p.add_rule(&[i, j], &[j, i]).unwrap();
            }
        }
    }
    p
}

#[allow(dead_code)]
pub(crate) fn triangle_group_2_3_7() -> Presentation {
    let mut p = free_monoid(2);
    p.add_rule(&w("xx", "xy"), &[]).unwrap();
    p.add_rule(&w("yyy", "xy"), &[]).unwrap();
    p.add_rule(&w("xyxyxyxyxyxyxy", "xy"), &[]).unwrap();
    p.add_rule(&w("yxyxyxyxyxyxyx", "xy"), &[]).unwrap();
    p
}

/// `PSL(2, Z)` on `S`, `T`, and the inverse of `T`.
#[allow(dead_code)]
pub(crate) fn modular_group() -> Presentation {
    let mut p = free_monoid(3);
    p.add_rule(&w("SS", "STt"), &[]).unwrap();
    p.add_rule(&w("Tt", "STt"), &[]).unwrap();
    p.add_rule(&w("tT", "STt"), &[]).unwrap();
    p.add_rule(&w("STSTST", "STt"), &[]).unwrap();
    p.add_rule(&w("TSTSTS", "STt"), &[]).unwrap();
    p
}

/// The Fibonacci group F(2, 9) on `a`, `b` and their formal inverses, with
/// the cyclically presented relations rewritten as length-reducing rules.
#[allow(dead_code)]
pub(crate) fn fibonacci_group_2_9() -> Presentation {
    const RULES: [(&str, &str); 15] = [
        ("Abababbab", "aBaaBaB"),
        ("babbabbAb", "ABaaBaa"),
        ("abbabbAbA", "BABaaBa"),
        ("bbabbAbAA", "ABABaaB"),
        ("babbAbAAb", "BABABaa"),
        ("abbAbAAbA", "BBABABa"),
        ("bbAbAAbAA", "ABBABAB"),
        ("bAbAAbAAb", "BABBABA"),
        ("AbAAbAAba", "BBABBAB"),
        ("bAAbAAbab", "aBBABBA"),
        ("AAbAAbaba", "BaBBABB"),
        ("AAbababb", "BaaBaBBA"),
        ("Abababba", "aBaaBaBB"),
        ("abbabaaBaaB", "bAbAAbA"),
        ("babaaBaaBaB", "BAbAbAA"),
    ];
    let mut p = free_monoid(4);
    for inverse in ["aA", "Aa", "bB", "Bb"] {
        p.add_rule(&w(inverse, "abAB"), &[]).unwrap();
    }
    for (lhs, rhs) in RULES {
        p.add_rule(&w(lhs, "abAB"), &w(rhs, "abAB")).unwrap();
    }
    p
}

pub(crate) fn random_word(rng: &mut impl Rng, len: usize, alphabet_size: u32) -> Word {
    (0..len).map(|_| rng.gen_range(0..alphabet_size)).collect()
}

/// Rejects any graph with a lexicographically smaller relabelling rooted at
/// another node, keeping one representative per conjugacy class of
/// subgroups when enumerating coset graphs of a group.
#[allow(dead_code)]
pub(crate) fn conjugacy_pruner(graph: &WordGraph) -> bool {
    let active = graph.number_of_active_nodes();
    for root in 1..active {
        let mut new_old = vec![u32::MAX; active as usize];
        let mut old_new = vec![u32::MAX; active as usize];
        new_old[0] = root;
        old_new[root as usize] = 0;
        let mut next = 0u32;
        let mut s = 0u32;
        'relabel: while s <= next {
            for a in 0..graph.out_degree() {
                let (t_old, sa) =
                    match (graph.target(new_old[s as usize], a), graph.target(s, a)) {
                        (Some(t_old), Some(sa)) => (t_old, sa),
                        // An incomplete relabelling decides nothing.
                        _ => break 'relabel,
                    };
                let mut t_new = old_new[t_old as usize];
                if t_new == u32::MAX {
                    next += 1;
                    old_new[t_old as usize] = next;
                    new_old[next as usize] = t_old;
                    t_new = next;
                }
                if sa < t_new {
                    break 'relabel;
                }
                if sa > t_new {
                    return false;
                }
            }
            s += 1;
        }
    }
    true
}
