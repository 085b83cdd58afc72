//! Strided, non-owning views over caller storage.
//!
//! Element `(i, j)` of a matrix view lives at `offset + i * rs + j * cs`
//! inside the borrowed buffer, so row-major, column-major and transposed
//! access are all the same type with different strides. Batches add a third
//! stride for the entry index.
//!
//! Constructors validate extents and strides once. Element access through
//! the `*_unchecked` methods performs no bounds checks; the kernels rely on
//! the constructor guarantees instead.

use std::marker::PhantomData;

use ndarray::{ArrayView3, ArrayViewMut3};

use crate::error::{view_error, Result};
use crate::scalar::Scalar;

/// Physical order of a contiguous `batch × rows × cols` buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layout {
    /// Row-major, last index fastest: strides `(rows * cols, cols, 1)`.
    Right,
    /// Column-major, first index fastest: strides `(1, batch, batch * rows)`.
    Left,
}

impl Layout {
    /// Strides `(batch, row, col)` of a contiguous buffer in this layout.
    pub fn strides(self, batch: usize, rows: usize, cols: usize) -> [isize; 3] {
        match self {
            Layout::Right => [(rows * cols) as isize, cols as isize, 1],
            Layout::Left => [1, batch as isize, (batch * rows) as isize],
        }
    }
}

/// Smallest and largest element index reached by a strided view, or `None`
/// when one of the extents is zero and nothing is addressed.
fn index_span(offset: usize, dims: &[usize], strides: &[isize]) -> Result<Option<(isize, isize)>> {
    if dims.contains(&0) {
        return Ok(None);
    }
    let overflow = || view_error("index computation overflows isize");
    let base = isize::try_from(offset).map_err(|_| overflow())?;
    let (mut lo, mut hi) = (base, base);
    for (&d, &s) in dims.iter().zip(strides) {
        let reach = isize::try_from(d - 1)
            .ok()
            .and_then(|d| d.checked_mul(s))
            .ok_or_else(overflow)?;
        if reach < 0 {
            lo = lo.checked_add(reach).ok_or_else(overflow)?;
        } else {
            hi = hi.checked_add(reach).ok_or_else(overflow)?;
        }
    }
    Ok(Some((lo, hi)))
}

fn check_bounds(len: usize, offset: usize, dims: &[usize], strides: &[isize]) -> Result<()> {
    match index_span(offset, dims, strides)? {
        None => Ok(()),
        Some((lo, _)) if lo < 0 => Err(view_error(format!(
            "extents {dims:?} with strides {strides:?} reach index {lo} before the buffer start"
        ))),
        Some((_, hi)) if hi as usize >= len => Err(view_error(format!(
            "extents {dims:?} with strides {strides:?} at offset {offset} reach index {hi}, \
             buffer length is {len}"
        ))),
        Some(_) => Ok(()),
    }
}

/// Sufficient condition for distinct multi-indices to address distinct
/// elements: sorted by stride magnitude, every stride must exceed the span
/// of all smaller axes.
pub(crate) fn is_non_overlapping(dims: &[usize], strides: &[isize]) -> bool {
    if dims.contains(&0) {
        return true;
    }
    let mut axes: Vec<(usize, usize)> = dims
        .iter()
        .zip(strides)
        .filter(|&(&d, _)| d > 1)
        .map(|(&d, &s)| (d, s.unsigned_abs()))
        .collect();
    axes.sort_by_key(|&(_, s)| s);

    let mut span = 0usize;
    for (d, s) in axes {
        if s <= span {
            return false;
        }
        span = match (d - 1).checked_mul(s).and_then(|r| span.checked_add(r)) {
            Some(span) => span,
            None => return false,
        };
    }
    true
}

fn check_writable(dims: &[usize], strides: &[isize]) -> Result<()> {
    if is_non_overlapping(dims, strides) {
        Ok(())
    } else {
        Err(view_error(format!(
            "extents {dims:?} with strides {strides:?} map distinct indices onto the same element"
        )))
    }
}

// ================================================================================================
// MATRIX VIEWS
// ================================================================================================

/// Read-only strided view of a `rows × cols` matrix.
///
/// Carries a conjugation flag so that `ConjTranspose` needs no copy: every
/// element read through the view is conjugated when the flag is set.
pub struct MatrixView<'a, T> {
    ptr: *const T,
    rows: usize,
    cols: usize,
    rs: isize,
    cs: isize,
    conj: bool,
    _marker: PhantomData<&'a [T]>,
}

impl<T> Clone for MatrixView<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for MatrixView<'_, T> {}

unsafe impl<T: Sync> Send for MatrixView<'_, T> {}
unsafe impl<T: Sync> Sync for MatrixView<'_, T> {}

impl<T> std::fmt::Debug for MatrixView<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatrixView")
            .field("rows", &self.rows)
            .field("cols", &self.cols)
            .field("strides", &(self.rs, self.cs))
            .field("conj", &self.conj)
            .finish()
    }
}

impl<'a, T: Scalar> MatrixView<'a, T> {
    /// View starting at the first element of `data`.
    pub fn new(data: &'a [T], rows: usize, cols: usize, rs: isize, cs: isize) -> Result<Self> {
        Self::with_offset(data, 0, rows, cols, rs, cs)
    }

    /// View whose element `(0, 0)` is `data[offset]`.
    pub fn with_offset(
        data: &'a [T],
        offset: usize,
        rows: usize,
        cols: usize,
        rs: isize,
        cs: isize,
    ) -> Result<Self> {
        check_bounds(data.len(), offset, &[rows, cols], &[rs, cs])?;
        Ok(Self {
            ptr: data.as_ptr().wrapping_add(offset),
            rows,
            cols,
            rs,
            cs,
            conj: false,
            _marker: PhantomData,
        })
    }

    pub fn from_row_major(data: &'a [T], rows: usize, cols: usize) -> Result<Self> {
        Self::new(data, rows, cols, cols as isize, 1)
    }

    pub fn from_col_major(data: &'a [T], rows: usize, cols: usize) -> Result<Self> {
        Self::new(data, rows, cols, 1, rows as isize)
    }

    /// # Safety
    ///
    /// `ptr` must address every `(i, j)` with `i < rows`, `j < cols` through
    /// the given strides for the lifetime `'a`.
    pub(crate) unsafe fn from_raw(
        ptr: *const T,
        rows: usize,
        cols: usize,
        rs: isize,
        cs: isize,
    ) -> Self {
        Self {
            ptr,
            rows,
            cols,
            rs,
            cs,
            conj: false,
            _marker: PhantomData,
        }
    }

    #[inline(always)]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline(always)]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline(always)]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    #[inline(always)]
    pub fn row_stride(&self) -> isize {
        self.rs
    }

    #[inline(always)]
    pub fn col_stride(&self) -> isize {
        self.cs
    }

    #[inline(always)]
    pub fn is_conj(&self) -> bool {
        self.conj
    }

    /// Same storage with rows and columns exchanged.
    pub fn transposed(self) -> Self {
        Self {
            rows: self.cols,
            cols: self.rows,
            rs: self.cs,
            cs: self.rs,
            ..self
        }
    }

    /// Same storage, every read conjugated (toggles the flag).
    pub fn conjugated(self) -> Self {
        Self {
            conj: !self.conj,
            ..self
        }
    }

    /// Element offset of `(i, j)` relative to element `(0, 0)`.
    #[inline(always)]
    pub fn at(&self, i: usize, j: usize) -> isize {
        i as isize * self.rs + j as isize * self.cs
    }

    /// Pointer to element `(i, j)`.
    #[inline(always)]
    pub(crate) fn ptr_at(&self, i: usize, j: usize) -> *const T {
        self.ptr.wrapping_offset(self.at(i, j))
    }

    /// Reads `(i, j)`, conjugated if the view is.
    ///
    /// # Safety
    ///
    /// `i < rows` and `j < cols`.
    #[inline(always)]
    pub unsafe fn get_unchecked(&self, i: usize, j: usize) -> T {
        let v = *self.ptr_at(i, j);
        if self.conj {
            v.conj()
        } else {
            v
        }
    }

    pub fn get(&self, i: usize, j: usize) -> Option<T> {
        if i < self.rows && j < self.cols {
            Some(unsafe { self.get_unchecked(i, j) })
        } else {
            None
        }
    }

    /// Copies the logical matrix out in row-major order.
    pub fn to_row_major_vec(&self) -> Vec<T> {
        let mut out = Vec::with_capacity(self.rows * self.cols);
        for i in 0..self.rows {
            for j in 0..self.cols {
                out.push(unsafe { self.get_unchecked(i, j) });
            }
        }
        out
    }
}

/// Mutable strided view of a `rows × cols` matrix.
///
/// Distinct `(i, j)` pairs always address distinct elements.
pub struct MatrixViewMut<'a, T> {
    ptr: *mut T,
    rows: usize,
    cols: usize,
    rs: isize,
    cs: isize,
    _marker: PhantomData<&'a mut [T]>,
}

unsafe impl<T: Send> Send for MatrixViewMut<'_, T> {}
unsafe impl<T: Sync> Sync for MatrixViewMut<'_, T> {}

impl<T> std::fmt::Debug for MatrixViewMut<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatrixViewMut")
            .field("rows", &self.rows)
            .field("cols", &self.cols)
            .field("strides", &(self.rs, self.cs))
            .finish()
    }
}

impl<'a, T: Scalar> MatrixViewMut<'a, T> {
    pub fn new(data: &'a mut [T], rows: usize, cols: usize, rs: isize, cs: isize) -> Result<Self> {
        Self::with_offset(data, 0, rows, cols, rs, cs)
    }

    pub fn with_offset(
        data: &'a mut [T],
        offset: usize,
        rows: usize,
        cols: usize,
        rs: isize,
        cs: isize,
    ) -> Result<Self> {
        check_bounds(data.len(), offset, &[rows, cols], &[rs, cs])?;
        check_writable(&[rows, cols], &[rs, cs])?;
        Ok(Self {
            ptr: data.as_mut_ptr().wrapping_add(offset),
            rows,
            cols,
            rs,
            cs,
            _marker: PhantomData,
        })
    }

    pub fn from_row_major(data: &'a mut [T], rows: usize, cols: usize) -> Result<Self> {
        Self::new(data, rows, cols, cols as isize, 1)
    }

    pub fn from_col_major(data: &'a mut [T], rows: usize, cols: usize) -> Result<Self> {
        Self::new(data, rows, cols, 1, rows as isize)
    }

    /// # Safety
    ///
    /// `ptr` must address every `(i, j)` through the given strides for `'a`,
    /// without overlap and without any other live reference to those elements.
    pub(crate) unsafe fn from_raw(
        ptr: *mut T,
        rows: usize,
        cols: usize,
        rs: isize,
        cs: isize,
    ) -> Self {
        Self {
            ptr,
            rows,
            cols,
            rs,
            cs,
            _marker: PhantomData,
        }
    }

    #[inline(always)]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline(always)]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline(always)]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    #[inline(always)]
    pub fn row_stride(&self) -> isize {
        self.rs
    }

    #[inline(always)]
    pub fn col_stride(&self) -> isize {
        self.cs
    }

    /// Shorter-lived mutable view of the same elements.
    pub fn reborrow(&mut self) -> MatrixViewMut<'_, T> {
        MatrixViewMut {
            ptr: self.ptr,
            rows: self.rows,
            cols: self.cols,
            rs: self.rs,
            cs: self.cs,
            _marker: PhantomData,
        }
    }

    /// Read-only view of the same elements.
    pub fn as_view(&self) -> MatrixView<'_, T> {
        unsafe { MatrixView::from_raw(self.ptr, self.rows, self.cols, self.rs, self.cs) }
    }

    #[inline(always)]
    pub fn at(&self, i: usize, j: usize) -> isize {
        i as isize * self.rs + j as isize * self.cs
    }

    #[inline(always)]
    pub(crate) fn ptr_at(&mut self, i: usize, j: usize) -> *mut T {
        self.ptr.wrapping_offset(self.at(i, j))
    }

    /// # Safety
    ///
    /// `i < rows` and `j < cols`.
    #[inline(always)]
    pub unsafe fn get_unchecked(&self, i: usize, j: usize) -> T {
        *self.ptr.wrapping_offset(self.at(i, j))
    }

    /// # Safety
    ///
    /// `i < rows` and `j < cols`.
    #[inline(always)]
    pub unsafe fn set_unchecked(&mut self, i: usize, j: usize, value: T) {
        *self.ptr_at(i, j) = value;
    }

    pub fn get(&self, i: usize, j: usize) -> Option<T> {
        if i < self.rows && j < self.cols {
            Some(unsafe { self.get_unchecked(i, j) })
        } else {
            None
        }
    }

    /// Writes `(i, j)`; returns `false` when out of range.
    pub fn set(&mut self, i: usize, j: usize, value: T) -> bool {
        if i < self.rows && j < self.cols {
            unsafe { self.set_unchecked(i, j, value) };
            true
        } else {
            false
        }
    }

    /// Overwrites every element without reading it.
    pub fn fill(&mut self, value: T) {
        for i in 0..self.rows {
            for j in 0..self.cols {
                unsafe { self.set_unchecked(i, j, value) };
            }
        }
    }

    /// Applies `f` to every element in place.
    pub fn map_inplace(&mut self, mut f: impl FnMut(T) -> T) {
        for i in 0..self.rows {
            for j in 0..self.cols {
                unsafe {
                    let p = self.ptr_at(i, j);
                    *p = f(*p);
                }
            }
        }
    }
}

// ================================================================================================
// BATCH VIEWS
// ================================================================================================

/// Read-only strided `batch × rows × cols` array.
pub struct BatchView<'a, T> {
    ptr: *const T,
    len: usize,
    rows: usize,
    cols: usize,
    strides: [isize; 3],
    _marker: PhantomData<&'a [T]>,
}

impl<T> Clone for BatchView<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for BatchView<'_, T> {}

unsafe impl<T: Sync> Send for BatchView<'_, T> {}
unsafe impl<T: Sync> Sync for BatchView<'_, T> {}

impl<T> std::fmt::Debug for BatchView<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchView")
            .field("len", &self.len)
            .field("rows", &self.rows)
            .field("cols", &self.cols)
            .field("strides", &self.strides)
            .finish()
    }
}

impl<'a, T: Scalar> BatchView<'a, T> {
    /// View of a contiguous buffer holding `len` matrices of `rows × cols`.
    pub fn new(
        data: &'a [T],
        layout: Layout,
        len: usize,
        rows: usize,
        cols: usize,
    ) -> Result<Self> {
        Self::with_strides(data, 0, len, rows, cols, layout.strides(len, rows, cols))
    }

    /// View with explicit `(batch, row, col)` strides; entry `0` element
    /// `(0, 0)` is `data[offset]`.
    pub fn with_strides(
        data: &'a [T],
        offset: usize,
        len: usize,
        rows: usize,
        cols: usize,
        strides: [isize; 3],
    ) -> Result<Self> {
        check_bounds(data.len(), offset, &[len, rows, cols], &strides)?;
        Ok(Self {
            ptr: data.as_ptr().wrapping_add(offset),
            len,
            rows,
            cols,
            strides,
            _marker: PhantomData,
        })
    }

    /// Borrows an ndarray view; axis 0 is the batch index.
    pub fn from_array(array: ArrayView3<'a, T>) -> Self {
        let (len, rows, cols) = array.dim();
        let s = array.strides();
        Self {
            ptr: array.as_ptr(),
            len,
            rows,
            cols,
            strides: [s[0], s[1], s[2]],
            _marker: PhantomData,
        }
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline(always)]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline(always)]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline(always)]
    pub fn strides(&self) -> [isize; 3] {
        self.strides
    }

    /// Matrix `k` of the batch.
    pub fn get(&self, k: usize) -> Option<MatrixView<'a, T>> {
        (k < self.len).then(|| unsafe { self.entry_unchecked(k) })
    }

    /// # Safety
    ///
    /// `k < len`.
    #[inline(always)]
    pub(crate) unsafe fn entry_unchecked(&self, k: usize) -> MatrixView<'a, T> {
        let [bs, rs, cs] = self.strides;
        MatrixView::from_raw(
            self.ptr.wrapping_offset(k as isize * bs),
            self.rows,
            self.cols,
            rs,
            cs,
        )
    }
}

/// Mutable strided `batch × rows × cols` array.
///
/// Construction rejects strides under which two entries (or two elements of
/// one entry) share storage, which is what makes writing entries from
/// several threads at once sound.
pub struct BatchViewMut<'a, T> {
    ptr: *mut T,
    len: usize,
    rows: usize,
    cols: usize,
    strides: [isize; 3],
    _marker: PhantomData<&'a mut [T]>,
}

unsafe impl<T: Send> Send for BatchViewMut<'_, T> {}
unsafe impl<T: Send> Sync for BatchViewMut<'_, T> {}

impl<T> std::fmt::Debug for BatchViewMut<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchViewMut")
            .field("len", &self.len)
            .field("rows", &self.rows)
            .field("cols", &self.cols)
            .field("strides", &self.strides)
            .finish()
    }
}

impl<'a, T: Scalar> BatchViewMut<'a, T> {
    pub fn new(
        data: &'a mut [T],
        layout: Layout,
        len: usize,
        rows: usize,
        cols: usize,
    ) -> Result<Self> {
        Self::with_strides(data, 0, len, rows, cols, layout.strides(len, rows, cols))
    }

    pub fn with_strides(
        data: &'a mut [T],
        offset: usize,
        len: usize,
        rows: usize,
        cols: usize,
        strides: [isize; 3],
    ) -> Result<Self> {
        check_bounds(data.len(), offset, &[len, rows, cols], &strides)?;
        check_writable(&[len, rows, cols], &strides)?;
        Ok(Self {
            ptr: data.as_mut_ptr().wrapping_add(offset),
            len,
            rows,
            cols,
            strides,
            _marker: PhantomData,
        })
    }

    /// Borrows a mutable ndarray view; axis 0 is the batch index.
    pub fn from_array_mut(mut array: ArrayViewMut3<'a, T>) -> Self {
        let (len, rows, cols) = array.dim();
        let s = array.strides();
        let strides = [s[0], s[1], s[2]];
        Self {
            ptr: array.as_mut_ptr(),
            len,
            rows,
            cols,
            strides,
            _marker: PhantomData,
        }
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline(always)]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline(always)]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline(always)]
    pub fn strides(&self) -> [isize; 3] {
        self.strides
    }

    /// Read-only view of the same elements.
    pub fn as_view(&self) -> BatchView<'_, T> {
        BatchView {
            ptr: self.ptr,
            len: self.len,
            rows: self.rows,
            cols: self.cols,
            strides: self.strides,
            _marker: PhantomData,
        }
    }

    /// Mutable matrix `k` of the batch.
    pub fn get_mut(&mut self, k: usize) -> Option<MatrixViewMut<'_, T>> {
        (k < self.len).then(|| unsafe { self.entry_shared(k) })
    }

    /// Mutable view of entry `k` obtained through a shared reference.
    ///
    /// # Safety
    ///
    /// `k < len`, and no two live views may be created for the same `k`.
    /// Views of distinct entries never overlap (checked at construction).
    #[inline(always)]
    pub(crate) unsafe fn entry_shared(&self, k: usize) -> MatrixViewMut<'_, T> {
        let [bs, rs, cs] = self.strides;
        MatrixViewMut::from_raw(
            self.ptr.wrapping_offset(k as isize * bs),
            self.rows,
            self.cols,
            rs,
            cs,
        )
    }
}
