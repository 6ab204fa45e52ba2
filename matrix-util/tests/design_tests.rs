use candle_core::Device;
use matrix_util::*;

#[test]
fn group_size_conservation() -> anyhow::Result<()> {
    let sizes = [2f32, 3., 0., 1.];
    let xx = group_assignment_matrix(&sizes)?;

    assert_eq!(xx.shape(), (6, 4));
    assert_eq!(xx.sum(), 6.0);

    for (j, &size) in sizes.iter().enumerate() {
        let col = xx.column(j);
        assert_eq!(col.sum(), size);

        // ones are contiguous
        let rows: Vec<usize> = (0..xx.nrows()).filter(|&i| col[i] == 1.0).collect();
        if let (Some(&lo), Some(&hi)) = (rows.first(), rows.last()) {
            assert_eq!(hi - lo + 1, rows.len());
        }
    }

    // each observation belongs to exactly one group, in column order
    for i in 0..xx.nrows() {
        assert_eq!(xx.row(i).sum(), 1.0);
    }
    assert_eq!(xx[(0, 0)], 1.0);
    assert_eq!(xx[(2, 1)], 1.0);
    assert_eq!(xx[(5, 3)], 1.0);
    Ok(())
}

#[test]
fn negative_sizes_are_rejected() {
    assert!(group_assignment_matrix(&[2., -1.]).is_err());
    assert!(group_assignment_matrix(&[f32::NAN]).is_err());
}

#[test]
fn batched_candidates() -> anyhow::Result<()> {
    let dev = Device::Cpu;
    let candidates = vec![vec![1f32, 4.], vec![2., 3.], vec![5., 0.]];
    let xx = batched_group_assignment(&candidates, &dev)?;
    assert_eq!(xx.dims(), &[3, 5, 2]);

    let col_sums: Vec<Vec<f32>> = xx.sum(1)?.to_vec2()?;
    assert_eq!(col_sums, vec![vec![1., 4.], vec![2., 3.], vec![5., 0.]]);

    let bad = vec![vec![1f32, 4.], vec![1., 1.]];
    assert!(batched_group_assignment(&bad, &dev).is_err());
    Ok(())
}
