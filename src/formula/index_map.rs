use std::{marker, ops, slice};
use vec_map;

use super::{Lit, Var};

pub type VarMap<V> = IdxMap<Var, V>;
pub type LitMap<V> = IdxMap<Lit, V>;
pub type VarVec<V> = IdxVec<Var, V>;
pub type LitVec<V> = IdxVec<Lit, V>;

pub trait Idx {
    fn idx(&self) -> usize;
    fn unidx(idx: usize) -> Self;
}

impl Idx for Var {
    #[inline]
    fn idx(&self) -> usize {
        self.index()
    }

    #[inline]
    fn unidx(idx: usize) -> Var {
        Var::from_index(idx)
    }
}

impl Idx for Lit {
    #[inline]
    fn idx(&self) -> usize {
        self.var_index() * 2 + self.sign_index()
    }

    #[inline]
    fn unidx(idx: usize) -> Lit {
        Var::from_index(idx >> 1).lit((idx & 1) != 0)
    }
}

pub struct IdxMap<K: Idx, V> {
    map: vec_map::VecMap<V>,
    ph: marker::PhantomData<K>,
}

impl<K: Idx, V> IdxMap<K, V> {
    pub fn new() -> Self {
        IdxMap {
            map: vec_map::VecMap::new(),
            ph: marker::PhantomData,
        }
    }

    #[inline]
    pub fn insert(&mut self, k: &K, v: V) -> Option<V> {
        self.map.insert(k.idx(), v)
    }

    #[inline]
    pub fn remove(&mut self, k: &K) -> Option<V> {
        self.map.remove(k.idx())
    }

    #[inline]
    pub fn get(&self, k: &K) -> Option<&V> {
        self.map.get(k.idx())
    }

    #[inline]
    pub fn contains_key(&self, k: &K) -> bool {
        self.map.contains_key(k.idx())
    }

    #[inline]
    pub fn clear(&mut self) {
        self.map.clear();
    }

    #[inline]
    pub fn iter(&self) -> Iter<K, V> {
        Iter {
            it: self.map.iter(),
            ph: marker::PhantomData,
        }
    }
}

impl<K: Idx, V> Default for IdxMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'r, K: Idx, V> ops::Index<&'r K> for IdxMap<K, V> {
    type Output = V;

    #[inline]
    fn index(&self, k: &'r K) -> &V {
        self.map.index(&k.idx())
    }
}

impl<'r, K: Idx, V> ops::IndexMut<&'r K> for IdxMap<K, V> {
    #[inline]
    fn index_mut(&mut self, k: &'r K) -> &mut V {
        self.map.index_mut(&k.idx())
    }
}

pub struct Iter<'a, K: Idx, V: 'a> {
    it: vec_map::Iter<'a, V>,
    ph: marker::PhantomData<K>,
}

impl<'a, K: Idx, V: 'a> Iterator for Iter<'a, K, V> {
    type Item = (K, &'a V);

    #[inline]
    fn next(&mut self) -> Option<(K, &'a V)> {
        self.it.next().map(|(idx, v)| (Idx::unidx(idx), v))
    }
}

pub struct IdxVec<K: Idx, V> {
    vec: Vec<V>,
    ph: marker::PhantomData<K>,
}

impl<K: Idx, V: Clone + Default> IdxVec<K, V> {
    pub fn new() -> Self {
        IdxVec {
            vec: Vec::new(),
            ph: marker::PhantomData,
        }
    }

    #[inline]
    pub fn init(&mut self, k: K) {
        while self.vec.len() <= k.idx() {
            self.vec.push(V::default());
        }
    }

    #[inline]
    pub fn iter(&self) -> slice::Iter<V> {
        self.vec.iter()
    }

    #[inline]
    pub fn iter_mut(&mut self) -> slice::IterMut<V> {
        self.vec.iter_mut()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.vec.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vec.is_empty()
    }
}

impl<K: Idx, V: Clone + Default> Default for IdxVec<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Idx, V> ops::Index<K> for IdxVec<K, V> {
    type Output = V;

    #[inline]
    fn index(&self, k: K) -> &V {
        &self.vec[k.idx()]
    }
}

impl<K: Idx, V> ops::IndexMut<K> for IdxVec<K, V> {
    #[inline]
    fn index_mut(&mut self, k: K) -> &mut V {
        &mut self.vec[k.idx()]
    }
}
