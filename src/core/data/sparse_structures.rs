use faer::MatRef;

//////////////////////////////
// Sparse format conversion //
//////////////////////////////

/// Type to describe the CompressedSparseFormat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressedSparseFormat {
    /// CSC-formatted data
    Csc,
    /// CSR-formatted data
    Csr,
}

/// Compressed sparse matrix in either CSC or CSR layout
///
/// ### Fields
///
/// * `data` - The stored values.
/// * `indices` - Row indices (CSC) or column indices (CSR) of the values.
/// * `indptr` - Column pointers (CSC) or row pointers (CSR).
/// * `cs_type` - Which of the two layouts the data is in.
/// * `shape` - Tuple of `(nrow, ncol)`.
#[derive(Debug, Clone)]
pub struct CompressedSparseData<T>
where
    T: Clone + Default,
{
    pub data: Vec<T>,
    pub indices: Vec<usize>,
    pub indptr: Vec<usize>,
    pub cs_type: CompressedSparseFormat,
    pub shape: (usize, usize),
}

impl<T> CompressedSparseData<T>
where
    T: Clone + Default,
{
    /// Generate a new CSC version of the matrix
    ///
    /// ### Params
    ///
    /// * `data` - The underlying data
    /// * `indices` - The row indices of the data
    /// * `indptr` - The column index pointers
    /// * `shape` - Tuple of `(nrow, ncol)`
    pub fn new_csc(data: &[T], indices: &[usize], indptr: &[usize], shape: (usize, usize)) -> Self {
        Self {
            data: data.to_vec(),
            indices: indices.to_vec(),
            indptr: indptr.to_vec(),
            cs_type: CompressedSparseFormat::Csc,
            shape,
        }
    }

    /// Generate a new CSR version of the matrix
    ///
    /// ### Params
    ///
    /// * `data` - The underlying data
    /// * `indices` - The column indices of the data
    /// * `indptr` - The row index pointers
    /// * `shape` - Tuple of `(nrow, ncol)`
    pub fn new_csr(data: &[T], indices: &[usize], indptr: &[usize], shape: (usize, usize)) -> Self {
        Self {
            data: data.to_vec(),
            indices: indices.to_vec(),
            indptr: indptr.to_vec(),
            cs_type: CompressedSparseFormat::Csr,
            shape,
        }
    }

    /// Transform from CSC to CSR or vice versa
    ///
    /// ### Returns
    ///
    /// The transformed version
    pub fn transform(self) -> Self {
        match self.cs_type {
            CompressedSparseFormat::Csc => transpose_compressed(self, CompressedSparseFormat::Csr),
            CompressedSparseFormat::Csr => transpose_compressed(self, CompressedSparseFormat::Csc),
        }
    }

    /// Returns the shape of the matrix
    ///
    /// ### Returns
    ///
    /// A tuple of `(nrow, ncol)`
    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    /// Returns the NNZ
    ///
    /// ### Returns
    ///
    /// The number of stored values
    pub fn get_nnz(&self) -> usize {
        self.data.len()
    }
}

impl CompressedSparseData<f64> {
    /// Compress a dense faer matrix into CSC format
    ///
    /// Exact zeros are dropped, everything else (including NaN) is stored.
    ///
    /// ### Params
    ///
    /// * `dense` - The dense matrix.
    pub fn from_dense_csc(dense: MatRef<f64>) -> Self {
        let (nrow, ncol) = dense.shape();
        let mut data = Vec::new();
        let mut indices = Vec::new();
        let mut indptr = Vec::with_capacity(ncol + 1);
        indptr.push(0_usize);

        for col in 0..ncol {
            for row in 0..nrow {
                let value = dense[(row, col)];
                if value != 0.0 {
                    data.push(value);
                    indices.push(row);
                }
            }
            indptr.push(data.len());
        }

        Self {
            data,
            indices,
            indptr,
            cs_type: CompressedSparseFormat::Csc,
            shape: (nrow, ncol),
        }
    }
}

/// Swap the compressed dimension of a CompressedSparseData
///
/// Entries within each compressed slice end up sorted by their index, as
/// the source slices are walked in order.
///
/// ### Params
///
/// * `sparse_data` - The data to transpose.
/// * `target` - The layout to produce; must differ from the input layout.
///
/// ### Returns
///
/// The same logical matrix in the `target` layout.
fn transpose_compressed<T>(
    sparse_data: CompressedSparseData<T>,
    target: CompressedSparseFormat,
) -> CompressedSparseData<T>
where
    T: Clone + Default,
{
    let (nrow, ncol) = sparse_data.shape();
    let n_target = match target {
        CompressedSparseFormat::Csr => nrow,
        CompressedSparseFormat::Csc => ncol,
    };
    let nnz = sparse_data.get_nnz();

    let mut new_ptr = vec![0_usize; n_target + 1];
    for &idx in &sparse_data.indices {
        new_ptr[idx + 1] += 1;
    }
    for i in 0..n_target {
        new_ptr[i + 1] += new_ptr[i];
    }

    let mut new_data = vec![T::default(); nnz];
    let mut new_indices = vec![0_usize; nnz];
    let mut next = new_ptr[..n_target].to_vec();

    for outer in 0..sparse_data.indptr.len().saturating_sub(1) {
        for pos in sparse_data.indptr[outer]..sparse_data.indptr[outer + 1] {
            let inner = sparse_data.indices[pos];
            let dest = next[inner];
            new_data[dest] = sparse_data.data[pos].clone();
            new_indices[dest] = outer;
            next[inner] += 1;
        }
    }

    CompressedSparseData {
        data: new_data,
        indices: new_indices,
        indptr: new_ptr,
        cs_type: target,
        shape: (nrow, ncol),
    }
}

///////////
// Tests //
///////////
