use crate::core::models::ids::MoleculeId;
use crate::core::models::molecule::Molecule;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Process-scoped molecule store. Structures are immutable once added;
/// the pipeline only ever reads positions, symbols, and masses.
#[derive(Default)]
pub struct MoleculeStore {
    molecules: RwLock<HashMap<MoleculeId, Arc<Molecule>>>,
}

impl MoleculeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, molecule: Molecule) -> MoleculeId {
        let id = MoleculeId::new();
        self.molecules
            .write()
            .expect("molecule store lock poisoned")
            .insert(id, Arc::new(molecule));
        id
    }

    pub fn get(&self, id: MoleculeId) -> Option<Arc<Molecule>> {
        self.molecules
            .read()
            .expect("molecule store lock poisoned")
            .get(&id)
            .cloned()
    }

    pub fn list(&self) -> Vec<(MoleculeId, Arc<Molecule>)> {
        self.molecules
            .read()
            .expect("molecule store lock poisoned")
            .iter()
            .map(|(id, mol)| (*id, Arc::clone(mol)))
            .collect()
    }
}
