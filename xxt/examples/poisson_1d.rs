//! Solve a 1-D Poisson problem on four simulated processes

use xxt::gallery::{block_owner, GlobalMatrix};
use xxt::{HandleRegistry, Hypercube, ThreadCluster, XxtError};

fn main() -> Result<(), XxtError> {
    let n = 16;
    let processes = 4;
    let matrix = GlobalMatrix::laplacian_1d(n);
    let owner = block_owner(n, processes);

    let pieces = ThreadCluster::new(processes).run(|comm| {
        let rank = comm.rank();
        let problem = matrix.distribute(&owner, rank);
        let registry = HandleRegistry::new();
        let mut solver = registry.create(comm);
        let m = problem.m();
        solver.factor(&problem.local2global, problem.n, m, problem.matrix)?;

        let mut x = vec![1.0; problem.n];
        solver.solve_in_place(&mut x)?;
        solver.destroy()?;
        Ok::<_, XxtError>((rank, problem.local2global[..problem.n].to_vec(), x))
    })?;

    for piece in pieces {
        let (rank, owned, x) = piece?;
        for (gid, value) in owned.iter().zip(&x) {
            // Exact solution of the discrete problem: k(n+1-k)/2 with k = gid + 1
            let k = *gid as f64 + 1.0;
            let exact = k * (n as f64 + 1.0 - k) / 2.0;
            println!("rank {rank}: x[{gid:2}] = {value:8.4} (exact {exact:8.4})");
        }
    }
    Ok(())
}
