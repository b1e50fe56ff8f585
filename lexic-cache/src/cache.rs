use lazy_static::lazy_static;
use std::collections::HashMap;
use std::sync::RwLock;
pub use string_cache::DefaultAtom as Atom;

// Stimulus words and screen labels are interned once so scenes can carry a
// small id and the renderer can cache rasterized pixmaps per atom.
struct Interner {
    atoms: Vec<Atom>,
    ids: HashMap<Atom, usize>,
}

lazy_static! {
    static ref TEXT_INTERNER: RwLock<Interner> = RwLock::new(Interner {
        atoms: Vec::new(),
        ids: HashMap::new(),
    });
}

/// Intern a string and return its id. Idempotent.
pub fn intern_text(s: &str) -> usize {
    let atom = Atom::from(s);
    if let Some(&id) = TEXT_INTERNER.read().unwrap().ids.get(&atom) {
        return id;
    }
    let mut interner = TEXT_INTERNER.write().unwrap();
    // Re-check under the write lock, another thread may have won the race.
    if let Some(&id) = interner.ids.get(&atom) {
        return id;
    }
    let id = interner.atoms.len();
    interner.atoms.push(atom.clone());
    interner.ids.insert(atom, id);
    id
}

/// Current count of unique texts.
pub fn text_count() -> usize {
    TEXT_INTERNER.read().unwrap().atoms.len()
}

/// Resolve an id back to its text. Ids out of range yield `None`.
pub fn get_text(id: usize) -> Option<Atom> {
    TEXT_INTERNER.read().unwrap().atoms.get(id).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_idempotent() {
        let a = intern_text("plonk");
        let b = intern_text("plonk");
        assert_eq!(a, b);
        assert_eq!(get_text(a).unwrap().as_ref(), "plonk");
    }

    #[test]
    fn distinct_texts_get_distinct_ids() {
        let a = intern_text("table");
        let b = intern_text("flirb");
        assert_ne!(a, b);
    }

    #[test]
    fn out_of_range_ids_resolve_to_none() {
        assert!(get_text(usize::MAX).is_none());
    }
}
