//! Nelder-Mead Simplex Minimisation
//! ================================
//!
//! Derivative-free search for the minimum of `f: ℝⁿ → ℝ`. A simplex of
//! `n + 1` points crawls through parameter space by replacing its worst
//! vertex:
//!
//! ```text
//!   reflect   p* = p̄ + 1.0·(p̄ - p_hi)        worst vertex mirrored through
//!                                             the centroid of the others
//!   expand    p** = p̄ + 2.0·(p* - p̄)         reflection was a new best:
//!                                             try going further
//!   contract  p** = p̄ + 0.5·(p_hi - p̄)       reflection was no good:
//!             p** = p̄ + 0.5·(p* - p̄)         pull back towards the centroid
//!   shrink    p_j = (p_j + p_lo) / 2          nothing helped: halve the
//!                                             simplex around the best vertex
//! ```
//!
//! Every `konvge` iterations the variance of the vertex values is checked
//! against `reqmin`. Once converged, each coordinate of the best vertex is
//! nudged by `step·0.001` in both directions; if any neighbour is lower the
//! search restarts from there with a small simplex.
//!
//! This follows algorithm AS 47 (O'Neill 1971) with the usual later
//! corrections. There is no quadratic-surface termination test.

const RCOEFF: f64 = 1.0;
const ECOEFF: f64 = 2.0;
const CCOEFF: f64 = 0.5;
const EPS: f64 = 0.001;

/// Outcome of a minimisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Converged and passed the local-minimum check.
    Converged,
    /// `reqmin <= 0`, empty start vector, `konvge < 1` or a step vector
    /// shorter than the start vector.
    InvalidInput,
    /// `kcount` evaluations used up before convergence.
    NotConverged,
}

impl Status {
    /// Numeric status code: 0 converged, 1 invalid input, 2 not converged.
    pub fn code(self) -> i32 {
        match self {
            Status::Converged => 0,
            Status::InvalidInput => 1,
            Status::NotConverged => 2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Minimum {
    /// Best point found; all zeros for invalid input.
    pub xmin: Vec<f64>,
    /// Objective value at `xmin`.
    pub ynewlo: f64,
    /// Number of objective evaluations.
    pub icount: usize,
    /// Number of restarts.
    pub numres: usize,
    pub status: Status,
}

/// Minimise `objective` starting from `start`.
///
/// - `reqmin`: terminating limit for the variance of vertex values.
/// - `step`: size and shape of the initial simplex, one entry per
///   coordinate.
/// - `konvge`: convergence is checked every `konvge` iterations.
/// - `kcount`: maximum number of objective evaluations.
///
/// The objective may carry side effects through its captures; it is called
/// in a deterministic order.
pub fn nelmin<F>(
    mut objective: F,
    start: &[f64],
    reqmin: f64,
    step: &[f64],
    konvge: usize,
    kcount: usize,
) -> Minimum
where
    F: FnMut(&[f64]) -> f64,
{
    let n = start.len();
    let mut xmin = vec![0.0; n];

    if reqmin <= 0.0 || n < 1 || konvge < 1 || step.len() < n {
        return Minimum {
            xmin,
            ynewlo: 0.0,
            icount: 0,
            numres: 0,
            status: Status::InvalidInput,
        };
    }

    let nn = n + 1;
    let rq = reqmin * n as f64;
    let mut start = start.to_vec();
    let mut p = vec![vec![0.0; n]; nn];
    let mut y = vec![0.0; nn];
    let mut pbar = vec![0.0; n];
    let mut pstar = vec![0.0; n];
    let mut p2star = vec![0.0; n];
    let mut plo = vec![0.0; n];

    let mut icount = 0usize;
    let mut numres = 0usize;
    let mut jcount = konvge;
    let mut del = 1.0;

    loop {
        // initial simplex around `start`
        p[n].copy_from_slice(&start);
        y[n] = objective(&start);
        icount += 1;
        for j in 0..n {
            let x = start[j];
            start[j] += step[j] * del;
            p[j].copy_from_slice(&start);
            y[j] = objective(&start);
            icount += 1;
            start[j] = x;
        }

        let (mut ilo, mut ylo) = lowest(&y);

        loop {
            if kcount <= icount {
                break;
            }

            // vertex to be replaced
            let mut ihi = 0;
            let mut yhi = y[0];
            for (i, &v) in y.iter().enumerate().skip(1) {
                if yhi < v {
                    yhi = v;
                    ihi = i;
                }
            }

            // centroid of all vertices but the worst
            for i in 0..n {
                let z: f64 = p.iter().map(|v| v[i]).sum::<f64>() - p[ihi][i];
                pbar[i] = z / n as f64;
            }

            for i in 0..n {
                pstar[i] = pbar[i] + RCOEFF * (pbar[i] - p[ihi][i]);
            }
            let ystar = objective(&pstar);
            icount += 1;

            if ystar < ylo {
                for i in 0..n {
                    p2star[i] = pbar[i] + ECOEFF * (pstar[i] - pbar[i]);
                }
                let y2star = objective(&p2star);
                icount += 1;

                if ystar < y2star {
                    p[ihi].copy_from_slice(&pstar);
                    y[ihi] = ystar;
                } else {
                    p[ihi].copy_from_slice(&p2star);
                    y[ihi] = y2star;
                }
            } else {
                let l = y.iter().filter(|&&v| ystar < v).count();

                if l > 1 {
                    p[ihi].copy_from_slice(&pstar);
                    y[ihi] = ystar;
                } else if l == 0 {
                    // contraction on the worst side
                    for i in 0..n {
                        p2star[i] = pbar[i] + CCOEFF * (p[ihi][i] - pbar[i]);
                    }
                    let y2star = objective(&p2star);
                    icount += 1;

                    if y[ihi] < y2star {
                        // shrink towards the best vertex
                        plo.copy_from_slice(&p[ilo]);
                        for j in 0..nn {
                            for i in 0..n {
                                p[j][i] = 0.5 * (p[j][i] + plo[i]);
                            }
                            xmin.copy_from_slice(&p[j]);
                            y[j] = objective(&xmin);
                            icount += 1;
                        }
                        (ilo, ylo) = lowest(&y);
                        continue;
                    }
                    p[ihi].copy_from_slice(&p2star);
                    y[ihi] = y2star;
                } else {
                    // contraction on the reflection side
                    for i in 0..n {
                        p2star[i] = pbar[i] + CCOEFF * (pstar[i] - pbar[i]);
                    }
                    let y2star = objective(&p2star);
                    icount += 1;

                    if y2star <= ystar {
                        p[ihi].copy_from_slice(&p2star);
                        y[ihi] = y2star;
                    } else {
                        p[ihi].copy_from_slice(&pstar);
                        y[ihi] = ystar;
                    }
                }
            }

            if y[ihi] < ylo {
                ylo = y[ihi];
                ilo = ihi;
            }

            jcount -= 1;
            if jcount > 0 {
                continue;
            }

            if icount <= kcount {
                jcount = konvge;
                let mean = y.iter().sum::<f64>() / nn as f64;
                let z: f64 = y.iter().map(|v| (v - mean) * (v - mean)).sum();
                if z <= rq {
                    break;
                }
            }
        }

        xmin.copy_from_slice(&p[ilo]);
        let ynewlo = y[ilo];

        if kcount < icount {
            return Minimum {
                xmin,
                ynewlo,
                icount,
                numres,
                status: Status::NotConverged,
            };
        }

        // local minimum check
        let mut is_minimum = true;
        for i in 0..n {
            del = step[i] * EPS;
            xmin[i] += del;
            let z = objective(&xmin);
            icount += 1;
            if z < ynewlo {
                is_minimum = false;
                break;
            }
            xmin[i] -= 2.0 * del;
            let z = objective(&xmin);
            icount += 1;
            if z < ynewlo {
                is_minimum = false;
                break;
            }
            xmin[i] += del;
        }

        if is_minimum {
            return Minimum {
                xmin,
                ynewlo,
                icount,
                numres,
                status: Status::Converged,
            };
        }

        start.copy_from_slice(&xmin);
        del = EPS;
        numres += 1;
    }
}

fn lowest(y: &[f64]) -> (usize, f64) {
    let mut ilo = 0;
    let mut ylo = y[0];
    for (i, &v) in y.iter().enumerate().skip(1) {
        if v < ylo {
            ylo = v;
            ilo = i;
        }
    }
    (ilo, ylo)
}
