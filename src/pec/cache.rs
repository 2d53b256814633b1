//-
// Copyright (c) 2024, the Pecmap authors
//
// This file is part of Pecmap.
//
// Pecmap is free software: you can  redistribute it and/or modify it under the
// terms of  the GNU General Public  License as published by  the Free Software
// Foundation, either version  3 of the License, or (at  your option) any later
// version.
//
// Pecmap is distributed  in the hope that  it will be useful,  but WITHOUT ANY
// WARRANTY; without  even the implied  warranty of MERCHANTABILITY  or FITNESS
// FOR  A PARTICULAR  PURPOSE.  See the  GNU General  Public  License for  more
// details.
//
// You should have received a copy of the GNU General Public License along with
// Pecmap. If not, see <http://www.gnu.org/licenses/>.

//! Lazily resolved values.

use std::cell::RefCell;
use std::rc::Rc;

/// State of one lazily computed property.
#[derive(Debug, Clone)]
enum Cached<T> {
    Unresolved,
    Resolved(Rc<T>),
    ResolvedAbsent,
}

/// A property computed on first access and never recomputed afterwards.
///
/// A computation which fails leaves the property unresolved, so the next
/// access tries again.
///
/// Values are handed out as `Rc`s so that callers can keep them without
/// holding a borrow of the cache.
#[derive(Debug)]
pub struct Lazy<T> {
    state: RefCell<Cached<T>>,
}

impl<T> Default for Lazy<T> {
    fn default() -> Self {
        Lazy {
            state: RefCell::new(Cached::Unresolved),
        }
    }
}

impl<T> Lazy<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// A `Lazy` which is already resolved to `value`.
    pub fn resolved(value: T) -> Self {
        Lazy {
            state: RefCell::new(Cached::Resolved(Rc::new(value))),
        }
    }

    pub fn is_resolved(&self) -> bool {
        match *self.state.borrow() {
            Cached::Unresolved => false,
            Cached::Resolved(_) | Cached::ResolvedAbsent => true,
        }
    }

    /// Return the value, computing it with `f` if this is the first
    /// successful access.
    ///
    /// `f` may itself access other `Lazy`s, but not this one.
    pub fn get_or_try_resolve<E>(
        &self,
        f: impl FnOnce() -> Result<Option<T>, E>,
    ) -> Result<Option<Rc<T>>, E> {
        match *self.state.borrow() {
            Cached::Resolved(ref value) => return Ok(Some(Rc::clone(value))),
            Cached::ResolvedAbsent => return Ok(None),
            Cached::Unresolved => (),
        }

        let resolved = f()?.map(Rc::new);
        *self.state.borrow_mut() = match resolved {
            Some(ref value) => Cached::Resolved(Rc::clone(value)),
            None => Cached::ResolvedAbsent,
        };
        Ok(resolved)
    }
}
