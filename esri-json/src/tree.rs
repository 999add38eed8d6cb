//! Parcours récursif des arbres de coordonnées
//!
//! Une feuille est une [`Position`], un nœud une séquence du même type.
//! La profondeur est bornée par le variant (au plus 3 niveaux).

use crate::types::Position;

pub(crate) trait CoordinateTree {
    fn for_each_position<F: FnMut(&Position)>(&self, f: &mut F);

    fn map_positions<F: FnMut(&mut Position)>(&mut self, f: &mut F);
}

impl CoordinateTree for Position {
    fn for_each_position<F: FnMut(&Position)>(&self, f: &mut F) {
        f(self)
    }

    fn map_positions<F: FnMut(&mut Position)>(&mut self, f: &mut F) {
        f(self)
    }
}

impl<T: CoordinateTree> CoordinateTree for Vec<T> {
    fn for_each_position<F: FnMut(&Position)>(&self, f: &mut F) {
        for child in self {
            child.for_each_position(f);
        }
    }

    fn map_positions<F: FnMut(&mut Position)>(&mut self, f: &mut F) {
        for child in self.iter_mut() {
            child.map_positions(f);
        }
    }
}
